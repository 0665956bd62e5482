use serde::{Deserialize, Serialize};

use super::supporting::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Green,
    Blue,
    Yellow,
    White,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub eye_color: Color,
    pub hair_color: Color,
    pub location: Location,
    // The gateway spells this with a capitalized acronym.
    #[serde(rename = "passportID")]
    pub passport_id: String,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn person_decodes_gateway_shape() {
        let person: Person = serde_json::from_value(json!({
            "id": 9,
            "eyeColor": "GREEN",
            "hairColor": "WHITE",
            "location": { "id": 4, "x": 0.0, "y": 1.0, "name": "Main gate" },
            "passportID": "AB1234567",
            "nationality": "FRANCE"
        }))
        .unwrap();

        assert_eq!(person.eye_color, Color::Green);
        assert_eq!(person.passport_id, "AB1234567");
    }
}
