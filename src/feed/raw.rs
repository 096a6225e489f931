//! Raw JSON records as served by the operator's endpoints.
//!
//! Values arrive as strings or numbers, and decimals use a comma separator
//! (`"-25,4284"`), so every field goes through a lenient scalar decoder.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::HashMap;

use crate::model::{Line, ShapePoint, Stop};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Scalar::deserialize(d)? {
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(v) => v.to_string(),
        Scalar::Text(v) => v.trim().to_string(),
        Scalar::Null => String::new(),
    })
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = text(d)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Scalar::deserialize(d)? {
        Scalar::Int(v) => Ok(v as f64),
        Scalar::Float(v) => Ok(v),
        Scalar::Text(v) => v
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid decimal '{v}'"))),
        Scalar::Null => Err(de::Error::custom("missing decimal")),
    }
}

fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Scalar::deserialize(d)? {
        Scalar::Int(v) => Ok(v),
        Scalar::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        Scalar::Float(v) => Err(de::Error::custom(format!("invalid integer {v}"))),
        Scalar::Text(v) => v
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid integer '{v}'"))),
        Scalar::Null => Err(de::Error::custom("missing integer")),
    }
}

/// One vertex from `getShapeLinha`.
#[derive(Debug, Deserialize)]
pub struct RawShapePoint {
    #[serde(rename = "SHP", deserialize_with = "integer")]
    pub route_id: i64,
    #[serde(rename = "LAT", deserialize_with = "decimal")]
    pub latitude: f64,
    #[serde(rename = "LON", deserialize_with = "decimal")]
    pub longitude: f64,
}

/// One stop from `getPontosLinha`.
#[derive(Debug, Deserialize)]
pub struct RawStop {
    #[serde(rename = "ITINERARY_ID", deserialize_with = "text")]
    pub itinerary_id: String,
    #[serde(rename = "GRUPO", default, deserialize_with = "text")]
    pub group: String,
    #[serde(rename = "NUM", deserialize_with = "text")]
    pub number: String,
    #[serde(rename = "NOME", default, deserialize_with = "text")]
    pub name: String,
    #[serde(rename = "TIPO", default, deserialize_with = "text")]
    pub stop_type: String,
    #[serde(rename = "SEQ", deserialize_with = "integer")]
    pub order: i64,
    #[serde(rename = "SENTIDO", default, deserialize_with = "text")]
    pub direction: String,
    #[serde(rename = "LAT", deserialize_with = "decimal")]
    pub latitude: f64,
    #[serde(rename = "LON", deserialize_with = "decimal")]
    pub longitude: f64,
}

/// One entry from `getLinhas`.
#[derive(Debug, Deserialize)]
pub struct RawLine {
    #[serde(rename = "COD", deserialize_with = "text")]
    pub line_number: String,
    #[serde(rename = "NOME", default, deserialize_with = "text")]
    pub name: String,
    #[serde(rename = "SOMENTE_CARTAO", default, deserialize_with = "optional_text")]
    pub fare_card_only: Option<String>,
    #[serde(rename = "CATEGORIA_SERVICO", default, deserialize_with = "optional_text")]
    pub service_category: Option<String>,
    #[serde(rename = "NOME_COR", default, deserialize_with = "optional_text")]
    pub color: Option<String>,
}

/// Converts raw vertices, numbering them 0.. per route in feed order.
pub fn shape_points(line_number: &str, raw: Vec<RawShapePoint>) -> Vec<ShapePoint> {
    let mut next_order: HashMap<i64, i64> = HashMap::new();
    raw.into_iter()
        .map(|r| {
            let counter = next_order.entry(r.route_id).or_insert(0);
            let order = *counter;
            *counter += 1;
            ShapePoint {
                line_number: line_number.to_string(),
                route_id: r.route_id,
                order,
                latitude: r.latitude,
                longitude: r.longitude,
            }
        })
        .collect()
}

pub fn stops(line_number: &str, raw: Vec<RawStop>) -> Vec<Stop> {
    raw.into_iter()
        .map(|r| Stop {
            line_number: line_number.to_string(),
            itinerary_id: r.itinerary_id,
            group: r.group,
            number: r.number,
            name: r.name,
            stop_type: r.stop_type,
            order: r.order,
            direction: r.direction,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect()
}

pub fn lines(raw: Vec<RawLine>) -> Vec<Line> {
    raw.into_iter()
        .map(|r| Line {
            line_number: r.line_number,
            name: r.name,
            fare_card_only: r.fare_card_only,
            service_category: r.service_category,
            color: r.color,
        })
        .collect()
}
