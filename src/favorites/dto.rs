use serde::{Deserialize, Serialize};

/// Request body for adding a favorite city.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub city_name: String,
    pub country: String,
}

/// Response for a successful removal.
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub message: &'static str,
}

impl RemovedResponse {
    pub fn removed() -> Self {
        Self {
            success: true,
            message: "Favorite removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_accepts_camel_case_keys() {
        let req: AddFavoriteRequest =
            serde_json::from_str(r#"{"cityName":"Paris","country":"FR"}"#).unwrap();
        assert_eq!(req.city_name, "Paris");
        assert_eq!(req.country, "FR");
    }

    #[test]
    fn removed_response_shape() {
        let json = serde_json::to_value(RemovedResponse::removed()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Favorite removed");
    }
}
