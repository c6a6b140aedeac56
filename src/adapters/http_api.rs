//! REST front-end router.
//!
//! Transport-free: whatever HTTP server hosts the station hands each
//! request's method, path and body to [`route`] and writes the returned
//! [`ApiResponse`] back.
//!
//! | Method | Path                       | Command                |
//! |--------|----------------------------|------------------------|
//! | GET    | `/status`                  | `GetStatus`            |
//! | POST   | `/reset`                   | `Reset`                |
//! | POST   | `/sensor/object-detected`  | `TriggerSensor(object)`|
//! | POST   | `/sensor/{blue,yellow,brown}` | `TriggerSensor(bin)` |
//! | POST   | `/classify`                | `SubmitClassification` |
//! | GET    | `/classification`          | `LastClassification`   |
//! | GET    | `/disposal`                | `LastDisposal`         |

use serde::Deserialize;
use serde_json::json;

use crate::app::commands::{AppCommand, CommandReply, RejectReason};
use crate::app::service::AppService;
use crate::sensors::{BinColor, SensorId};

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }).to_string(),
        }
    }

    fn from_reply(reply: &CommandReply) -> Self {
        let status = match reply {
            CommandReply::Rejected {
                reason: RejectReason::InvalidPayload,
                ..
            } => 400,
            CommandReply::Rejected { .. } => 409,
            _ => 200,
        };
        match serde_json::to_string(reply) {
            Ok(body) => Self { status, body },
            Err(_) => Self::error(500, "could not encode reply"),
        }
    }
}

/// Body of `POST /classify`.  Either a bin colour or a material class.
#[derive(Debug, Deserialize)]
struct ClassifyBody {
    bin_color: Option<BinColor>,
    material: Option<String>,
    confidence: Option<f32>,
}

/// Translate one request into a command, or an error response.
fn parse(method: &str, path: &str, body: &str) -> Result<AppCommand, ApiResponse> {
    let path = path.trim_end_matches('/');
    match (method, path) {
        ("GET", "/status") => Ok(AppCommand::GetStatus),
        ("POST", "/reset") => Ok(AppCommand::Reset),
        ("GET", "/classification") => Ok(AppCommand::LastClassification),
        ("GET", "/disposal") => Ok(AppCommand::LastDisposal),
        ("POST", "/classify") => parse_classify(body),
        ("POST", p) if p.starts_with("/sensor/") => p["/sensor/".len()..]
            .parse::<SensorId>()
            .map(AppCommand::TriggerSensor)
            .map_err(|_| ApiResponse::error(404, "unknown sensor")),
        _ => Err(ApiResponse::error(404, "no such route")),
    }
}

fn parse_classify(body: &str) -> Result<AppCommand, ApiResponse> {
    let req: ClassifyBody =
        serde_json::from_str(body).map_err(|_| ApiResponse::error(400, "malformed JSON body"))?;

    let bin_color = match (req.bin_color, req.material.as_deref()) {
        (Some(bin), _) => bin,
        (None, Some(material)) => BinColor::for_material(material)
            .ok_or_else(|| ApiResponse::error(400, "material maps to no bin"))?,
        (None, None) => return Err(ApiResponse::error(400, "bin_color or material required")),
    };
    Ok(AppCommand::SubmitClassification {
        bin_color,
        confidence: req.confidence.unwrap_or(1.0),
    })
}

/// Handle one request against `service`.
pub fn route(service: &AppService, method: &str, path: &str, body: &str) -> ApiResponse {
    match parse(method, path, body) {
        Ok(cmd) => ApiResponse::from_reply(&service.handle_command(cmd)),
        Err(resp) => resp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_commands() {
        assert_eq!(parse("GET", "/status", ""), Ok(AppCommand::GetStatus));
        assert_eq!(parse("POST", "/reset/", ""), Ok(AppCommand::Reset));
        assert_eq!(
            parse("POST", "/sensor/object-detected", ""),
            Ok(AppCommand::TriggerSensor(SensorId::Object))
        );
        assert_eq!(
            parse("POST", "/sensor/brown", ""),
            Ok(AppCommand::TriggerSensor(SensorId::Brown))
        );
    }

    #[test]
    fn unknown_routes_are_404() {
        assert_eq!(parse("GET", "/nope", "").unwrap_err().status, 404);
        assert_eq!(parse("POST", "/sensor/green", "").unwrap_err().status, 404);
        assert_eq!(parse("DELETE", "/status", "").unwrap_err().status, 404);
    }

    #[test]
    fn classify_accepts_colour_or_material() {
        assert_eq!(
            parse("POST", "/classify", r#"{"bin_color":"blue","confidence":0.92}"#),
            Ok(AppCommand::SubmitClassification {
                bin_color: BinColor::Blue,
                confidence: 0.92
            })
        );
        assert_eq!(
            parse("POST", "/classify", r#"{"material":"PLASTIC"}"#),
            Ok(AppCommand::SubmitClassification {
                bin_color: BinColor::Yellow,
                confidence: 1.0
            })
        );
    }

    #[test]
    fn bad_classify_bodies_are_400() {
        assert_eq!(parse("POST", "/classify", "{").unwrap_err().status, 400);
        assert_eq!(parse("POST", "/classify", "{}").unwrap_err().status, 400);
        assert_eq!(
            parse("POST", "/classify", r#"{"material":"rock"}"#)
                .unwrap_err()
                .status,
            400
        );
    }
}
