use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Builds a point from an optional pair, treating a missing, zero or
    /// non-finite axis as absent.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) if present(lat) && present(lng) => Some(Self::new(lat, lng)),
            _ => None,
        }
    }
}

fn present(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Route metadata as returned by `GET /routes/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub inicio_lat: Option<f64>,
    #[serde(default)]
    pub inicio_lng: Option<f64>,
    #[serde(default)]
    pub inicio_nombre: Option<String>,
    #[serde(default)]
    pub destino_lat: Option<f64>,
    #[serde(default)]
    pub destino_lng: Option<f64>,
    #[serde(default)]
    pub destino_nombre: Option<String>,
    #[serde(default)]
    pub geometria: Value,
    #[serde(default)]
    pub estudiantes: Vec<Student>,
}

impl Route {
    #[must_use]
    pub fn start(&self) -> Option<Position> {
        Position::from_parts(self.inicio_lat, self.inicio_lng)
    }

    #[must_use]
    pub fn end(&self) -> Option<Position> {
        Position::from_parts(self.destino_lat, self.destino_lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub latitud: Option<f64>,
    #[serde(default)]
    pub longitud: Option<f64>,
}

impl Student {
    #[must_use]
    pub fn home(&self) -> Option<Position> {
        Position::from_parts(self.latitud, self.longitud)
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }
}

/// Backend ids arrive as strings or plain numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}

/// Entry parameters handed to the tracking screen by navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenParams {
    pub route_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub student_name: Option<String>,
    pub plate: Option<String>,
}

impl ScreenParams {
    /// Route and vehicle ids, when both are present and non-empty.
    #[must_use]
    pub fn targets(&self) -> Option<(&str, &str)> {
        let route_id = self.route_id.as_deref().filter(|id| !id.is_empty())?;
        let vehicle_id = self.vehicle_id.as_deref().filter(|id| !id.is_empty())?;
        Some((route_id, vehicle_id))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn route_from_wire() {
        let route: Route = serde_json::from_value(json!({
            "id": "r1",
            "nombre": "Ruta Norte",
            "inicioLat": -17.37,
            "inicioLng": -66.15,
            "inicioNombre": "Plaza",
            "estudiantes": [
                {"id": "s1", "nombre": "Ana", "apellido": "Rojas", "latitud": -17.38, "longitud": -66.2},
                {"id": "s2", "nombre": "Luis", "apellido": "Vaca"}
            ]
        }))
        .expect("route should deserialize");

        assert_eq!(route.start(), Some(Position::new(-17.37, -66.15)));
        assert_eq!(route.end(), None);
        assert!(route.geometria.is_null());
        assert_eq!(route.estudiantes[0].home(), Some(Position::new(-17.38, -66.2)));
        assert_eq!(route.estudiantes[1].home(), None);
        assert_eq!(route.estudiantes[0].full_name(), "Ana Rojas");
    }

    #[test]
    fn numeric_ids() {
        let route: Route = serde_json::from_value(json!({
            "id": 12,
            "nombre": "Ruta Sur",
            "estudiantes": [{"id": 7, "nombre": "Ana", "apellido": "Rojas"}]
        }))
        .expect("numeric ids should deserialize");

        assert_eq!(route.id, "12");
        assert_eq!(route.estudiantes[0].id, "7");
        assert!(serde_json::from_value::<Route>(json!({"id": true})).is_err());
    }

    #[test]
    fn zero_axis_is_absent() {
        assert_eq!(Position::from_parts(Some(0.0), Some(-66.3)), None);
        assert_eq!(Position::from_parts(Some(f64::NAN), Some(-66.3)), None);
    }

    #[test]
    fn targets_need_both_ids() {
        let params = ScreenParams {
            route_id: Some("r1".to_string()),
            vehicle_id: Some(String::new()),
            ..ScreenParams::default()
        };
        assert_eq!(params.targets(), None);
    }
}
