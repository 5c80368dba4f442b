//! Message protocol between the widget and the citation engine worker.
//!
//! Both directions are JSON objects tagged by `command`. Responses may be
//! wrapped in a `{result, msg}` envelope; `decode_response` checks the
//! envelope before decoding the payload.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::CiteError;
use crate::types::{Citation, CitationMode, CitationPosition};

/// The two operations the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCommand {
    InitProcessor,
    RegisterCitation,
}

impl EngineCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitProcessor => "initProcessor",
            Self::RegisterCitation => "registerCitation",
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests posted to the engine worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum EngineRequest {
    /// (Re)initialize the processor, optionally with existing citations.
    #[serde(rename_all = "camelCase")]
    InitProcessor {
        style_name: SmolStr,
        locale_name: SmolStr,
        citation_by_index: Vec<Citation>,
    },
    /// Register one citation between its document-order neighbours.
    #[serde(rename_all = "camelCase")]
    RegisterCitation {
        citation: Citation,
        pre_citations: Vec<CitationPosition>,
        post_citations: Vec<CitationPosition>,
    },
}

impl EngineRequest {
    pub fn command(&self) -> EngineCommand {
        match self {
            Self::InitProcessor { .. } => EngineCommand::InitProcessor,
            Self::RegisterCitation { .. } => EngineCommand::RegisterCitation,
        }
    }
}

/// Responses received from the engine worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum EngineResponse {
    #[serde(rename_all = "camelCase")]
    InitProcessor {
        xclass: CitationMode,
        #[serde(default)]
        rebuild_data: Vec<RebuildEntry>,
        #[serde(default)]
        bibliography_data: BibliographyData,
    },
    #[serde(rename_all = "camelCase")]
    RegisterCitation {
        citation_by_index: Vec<Citation>,
        #[serde(default)]
        citation_data: Vec<CitationUpdate>,
        #[serde(default)]
        bibliography_data: BibliographyData,
    },
}

impl EngineResponse {
    pub fn command(&self) -> EngineCommand {
        match self {
            Self::InitProcessor { .. } => EngineCommand::InitProcessor,
            Self::RegisterCitation { .. } => EngineCommand::RegisterCitation,
        }
    }
}

/// `[citationID, noteNumber, citeString]` from an init response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildEntry(pub SmolStr, pub u32, pub String);

/// One citation whose rendered text changed.
///
/// On the wire this is `[index, citeString]` or `[index, citeString,
/// citationID]`, where `index` is the citation's position in
/// `citationByIndex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CitationUpdateRepr", into = "CitationUpdateRepr")]
pub struct CitationUpdate {
    pub index: usize,
    pub cite_string: String,
    pub citation_id: Option<SmolStr>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CitationUpdateRepr {
    WithId(usize, String, SmolStr),
    Bare(usize, String),
}

impl From<CitationUpdateRepr> for CitationUpdate {
    fn from(repr: CitationUpdateRepr) -> Self {
        match repr {
            CitationUpdateRepr::WithId(index, cite_string, id) => Self {
                index,
                cite_string,
                citation_id: Some(id),
            },
            CitationUpdateRepr::Bare(index, cite_string) => Self {
                index,
                cite_string,
                citation_id: None,
            },
        }
    }
}

impl From<CitationUpdate> for CitationUpdateRepr {
    fn from(update: CitationUpdate) -> Self {
        match update.citation_id {
            Some(id) => Self::WithId(update.index, update.cite_string, id),
            None => Self::Bare(update.index, update.cite_string),
        }
    }
}

/// Rendered bibliography entries, or `None` when the style has no bibliography.
///
/// Accepts a plain entry array, the engine's `[params, entries]` pair, or
/// `null`/`false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibliographyData(pub Option<Vec<String>>);

impl BibliographyData {
    pub fn entries(&self) -> Option<&[String]> {
        self.0.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BibliographyRepr {
    Entries(Vec<String>),
    WithParams(Value, Vec<String>),
    Absent(Option<bool>),
}

impl<'de> Deserialize<'de> for BibliographyData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match BibliographyRepr::deserialize(deserializer)? {
            BibliographyRepr::Entries(entries) | BibliographyRepr::WithParams(_, entries) => {
                Self(Some(entries))
            }
            BibliographyRepr::Absent(_) => Self(None),
        })
    }
}

impl Serialize for BibliographyData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    msg: Option<Value>,
}

/// Render an envelope field for an error message. Strings are used as-is.
fn envelope_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Decode a worker message into a response.
///
/// A `result` field other than `"OK"` is reported as `CiteError::Engine`
/// carrying `msg`, or the `result` itself when there is no message. Messages
/// without an envelope are decoded directly.
pub fn decode_response(value: Value) -> Result<EngineResponse, CiteError> {
    let envelope = Envelope::deserialize(&value)?;
    match envelope.result {
        None | Some(Value::Null) => {}
        Some(Value::String(ref ok)) if ok == "OK" => {}
        Some(result) => {
            let msg = envelope.msg.filter(|msg| !msg.is_null()).unwrap_or(result);
            return Err(CiteError::Engine(envelope_text(msg)));
        }
    }
    Ok(EngineResponse::deserialize(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_init_request_wire_format() {
        let request = EngineRequest::InitProcessor {
            style_name: "jm-indigobook-law-review".into(),
            locale_name: "en-US".into(),
            citation_by_index: Vec::new(),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&request).unwrap(),
            @r#"{"command":"initProcessor","styleName":"jm-indigobook-law-review","localeName":"en-US","citationByIndex":[]}"#
        );
    }

    #[test]
    fn test_register_request_wire_format() {
        let request = EngineRequest::RegisterCitation {
            citation: Citation::from_items(["item-1"]),
            pre_citations: vec![CitationPosition::new("c1", 1)],
            post_citations: Vec::new(),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&request).unwrap(),
            @r#"{"command":"registerCitation","citation":{"citationItems":[{"id":"item-1"}],"properties":{"noteIndex":0}},"preCitations":[["c1",1]],"postCitations":[]}"#
        );
    }

    #[test]
    fn test_decode_init_response() {
        let response = decode_response(json!({
            "command": "initProcessor",
            "xclass": "in-text",
            "rebuildData": [["c1", 0, "(Doe 2020)"]],
            "bibliographyData": ["<div class=\"csl-entry\">Doe</div>"]
        }))
        .unwrap();

        let EngineResponse::InitProcessor {
            xclass,
            rebuild_data,
            bibliography_data,
        } = response
        else {
            panic!("expected init response");
        };
        assert_eq!(xclass, CitationMode::InText);
        assert_eq!(rebuild_data, vec![RebuildEntry("c1".into(), 0, "(Doe 2020)".into())]);
        assert_eq!(bibliography_data.entries().map(<[String]>::len), Some(1));
    }

    #[test]
    fn test_decode_register_response_with_both_update_shapes() {
        let response = decode_response(json!({
            "command": "registerCitation",
            "citationByIndex": [{"citationID": "c1", "citationItems": [{"id": "a"}]}],
            "citationData": [[0, "Doe, 1"], [1, "Roe, 2", "c2"]],
            "bibliographyData": false
        }))
        .unwrap();

        let EngineResponse::RegisterCitation {
            citation_by_index,
            citation_data,
            bibliography_data,
        } = response
        else {
            panic!("expected register response");
        };
        assert_eq!(citation_by_index.len(), 1);
        assert_eq!(citation_data[0].citation_id, None);
        assert_eq!(citation_data[1].citation_id.as_deref(), Some("c2"));
        assert_eq!(citation_data[1].index, 1);
        assert_eq!(bibliography_data.entries(), None);
    }

    #[test]
    fn test_bibliography_with_params_pair() {
        let data: BibliographyData =
            serde_json::from_value(json!([{"maxoffset": 0}, ["<div>A</div>", "<div>B</div>"]]))
                .unwrap();
        assert_eq!(data.entries().map(<[String]>::len), Some(2));

        let data: BibliographyData = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(data, BibliographyData(None));
    }

    #[test]
    fn test_envelope_ok_is_transparent() {
        let response = decode_response(json!({
            "result": "OK",
            "command": "initProcessor",
            "xclass": "note"
        }))
        .unwrap();
        assert_eq!(response.command(), EngineCommand::InitProcessor);
    }

    #[test]
    fn test_envelope_error_is_engine_failure() {
        let err = decode_response(json!({
            "result": "ERROR",
            "msg": "style not found",
            "command": "initProcessor"
        }))
        .unwrap_err();
        assert!(err.is_engine_failure());
        assert_eq!(err.to_string(), "engine reported failure: style not found");
    }

    #[test]
    fn test_envelope_object_result_is_engine_failure() {
        let err = decode_response(json!({
            "command": "initProcessor",
            "result": {"code": 1},
            "msg": "boom"
        }))
        .unwrap_err();
        assert!(err.is_engine_failure());
        assert_eq!(err.to_string(), "engine reported failure: boom");

        let err = decode_response(json!({"result": {"code": 1}})).unwrap_err();
        assert_eq!(err.to_string(), r#"engine reported failure: {"code":1}"#);
    }

    #[test]
    fn test_unknown_command_is_decode_error() {
        let err = decode_response(json!({"command": "makeBibliography"})).unwrap_err();
        assert!(matches!(err, CiteError::Serialization(_)));
    }
}
