use serde::{Deserialize, Serialize};

use super::non_empty;
use crate::{
    errors::{AppError, Result},
    utils::geo::Coordinates,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBox {
    #[serde(rename(deserialize = "_id"), alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub info_text: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub book_count: u32,
}

fn default_active() -> bool {
    true
}

impl BookBox {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// The search endpoint answers either `{ "bookboxes": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BookBoxList {
    Wrapped { bookboxes: Vec<BookBox> },
    Bare(Vec<BookBox>),
}

impl BookBoxList {
    pub fn into_vec(self) -> Vec<BookBox> {
        match self {
            BookBoxList::Wrapped { bookboxes } => bookboxes,
            BookBoxList::Bare(bookboxes) => bookboxes,
        }
    }
}

/// Body sent to the Lino API when creating or updating a book box.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBoxPayload {
    pub name: String,
    pub image: String,
    pub longitude: f64,
    pub latitude: f64,
    pub info_text: String,
}

/// Fields collected from the create/update form before the image is hosted.
#[derive(Debug, Clone, Default)]
pub struct BookBoxForm {
    pub name: Option<String>,
    pub info_text: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub image_url: Option<String>,
}

impl BookBoxForm {
    pub fn set_text_field(&mut self, name: &str, value: String) {
        match name {
            "name" | "title" => self.name = Some(value),
            "infoText" => self.info_text = Some(value),
            "latitude" | "lat" => self.latitude = Some(value),
            "longitude" | "lng" => self.longitude = Some(value),
            "imageUrl" => self.image_url = Some(value),
            other => tracing::debug!("Ignoring unknown book box form field {}", other),
        }
    }

    /// Validates the form and builds the API payload around an already hosted image.
    pub fn into_payload(self, image: String) -> Result<BookBoxPayload> {
        let name = non_empty(self.name)
            .ok_or_else(|| AppError::Validation("Name is required".to_string()))?;
        let latitude = parse_coordinate(self.latitude, "latitude")?;
        let longitude = parse_coordinate(self.longitude, "longitude")?;
        let coordinates = Coordinates::new(latitude, longitude);
        coordinates.validate()?;

        Ok(BookBoxPayload {
            name,
            image,
            longitude,
            latitude,
            info_text: self.info_text.unwrap_or_default().trim().to_string(),
        })
    }
}

fn parse_coordinate(value: Option<String>, field: &str) -> Result<f64> {
    let raw = non_empty(value)
        .ok_or_else(|| AppError::Validation(format!("A {} is required", field)))?;
    raw.parse::<f64>()
        .map_err(|_| AppError::Validation(format!("Invalid {}: {}", field, raw)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortClass {
    #[default]
    #[serde(rename = "by name")]
    ByName,
    #[serde(rename = "by number of books")]
    ByNumberOfBooks,
    #[serde(rename = "by location")]
    ByLocation,
}

impl SortClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortClass::ByName => "by name",
            SortClass::ByNumberOfBooks => "by number of books",
            SortClass::ByLocation => "by location",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookBoxSearch {
    pub q: Option<String>,
    #[serde(default)]
    pub cls: SortClass,
    #[serde(default = "default_ascending")]
    pub asc: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_ascending() -> bool {
    true
}

impl Default for BookBoxSearch {
    fn default() -> Self {
        Self {
            q: None,
            cls: SortClass::ByName,
            asc: true,
            latitude: None,
            longitude: None,
        }
    }
}

impl BookBoxSearch {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = non_empty(self.q.clone()) {
            pairs.push(("q", q));
        }
        pairs.push(("cls", self.cls.as_str().to_string()));
        pairs.push(("asc", self.asc.to_string()));
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            pairs.push(("longitude", longitude.to_string()));
            pairs.push(("latitude", latitude.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub new_owner: String,
}

/// Optional position of the admin, used to show how far a book box is.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl LocationQuery {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let coordinates = Coordinates::new(lat, lng);
                coordinates.validate().ok().map(|_| coordinates)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bookbox_from_api() {
        let bookbox: BookBox = serde_json::from_value(json!({
            "_id": "665f",
            "name": "Parc Jarry",
            "image": "https://i.ibb.co/x.png",
            "infoText": "Near the tennis courts",
            "latitude": 45.5336,
            "longitude": -73.6282,
            "owner": "alice"
        }))
        .unwrap();

        assert_eq!(bookbox.id, "665f");
        assert!(bookbox.is_active);
        assert_eq!(bookbox.book_count, 0);

        let out = serde_json::to_value(&bookbox).unwrap();
        assert_eq!(out["id"], "665f");
        assert_eq!(out["infoText"], "Near the tennis courts");
    }

    #[test]
    fn test_form_requires_name() {
        let form = BookBoxForm {
            name: Some("   ".to_string()),
            latitude: Some("45.5".to_string()),
            longitude: Some("-73.6".to_string()),
            ..BookBoxForm::default()
        };
        let err = form.into_payload("img".to_string()).unwrap_err();
        assert_eq!(err.user_message(), "Name is required");
    }

    #[test]
    fn test_form_rejects_out_of_range_latitude() {
        let form = BookBoxForm {
            name: Some("Box".to_string()),
            latitude: Some("95".to_string()),
            longitude: Some("-73.6".to_string()),
            ..BookBoxForm::default()
        };
        assert!(matches!(
            form.into_payload("img".to_string()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_form_builds_payload() {
        let mut form = BookBoxForm::default();
        form.set_text_field("title", "Box".to_string());
        form.set_text_field("infoText", " hello ".to_string());
        form.set_text_field("lat", "45.5".to_string());
        form.set_text_field("lng", "-73.6".to_string());

        let payload = form.into_payload("https://img".to_string()).unwrap();
        assert_eq!(payload.name, "Box");
        assert_eq!(payload.info_text, "hello");

        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body["infoText"], "hello");
        assert_eq!(body["image"], "https://img");
    }

    #[test]
    fn test_search_query_pairs() {
        let search = BookBoxSearch {
            q: Some("".to_string()),
            cls: SortClass::ByLocation,
            asc: false,
            latitude: Some(45.0),
            longitude: Some(-73.0),
        };
        assert_eq!(
            search.query_pairs(),
            vec![
                ("cls", "by location".to_string()),
                ("asc", "false".to_string()),
                ("longitude", "-73".to_string()),
                ("latitude", "45".to_string()),
            ]
        );
    }
}
