//! In-memory events and their HTTP encodings.
//!
//! `Event` holds CloudEvents attributes and data. `EventMessage` pairs an
//! event with the encoding it is written in.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{Map, Value};

use crate::message::{Encoding, Message, MessageError};

pub const SPEC_VERSION: &str = "1.0";

/// Media type of a structured JSON event.
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Header prefix of binary-mode attributes.
pub const ATTRIBUTE_PREFIX: &str = "ce-";

const RESERVED: [&str; 10] = [
    "specversion",
    "id",
    "source",
    "type",
    "datacontenttype",
    "dataschema",
    "subject",
    "time",
    "data",
    "data_base64",
];

/// A CloudEvent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub source: String,
    pub ty: String,
    pub specversion: String,
    pub datacontenttype: Option<String>,
    pub dataschema: Option<String>,
    pub subject: Option<String>,
    pub time: Option<String>,
    /// Extension attributes, kept as strings.
    pub extensions: BTreeMap<String, String>,
    pub data: Option<Bytes>,
}

impl Event {
    /// Create an event with the required attributes and no data.
    pub fn new(id: impl Into<String>, source: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            ty: ty.into(),
            specversion: SPEC_VERSION.to_string(),
            datacontenttype: None,
            dataschema: None,
            subject: None,
            time: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    /// Attach data with its content type.
    pub fn with_data(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.datacontenttype = Some(content_type.into());
        self.data = Some(data.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add an extension attribute. Names are lowercased.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Serialize in the JSON event format.
    pub fn to_json(&self) -> Result<Vec<u8>, MessageError> {
        let mut object = Map::new();
        object.insert("specversion".into(), Value::String(self.specversion.clone()));
        object.insert("id".into(), Value::String(self.id.clone()));
        object.insert("source".into(), Value::String(self.source.clone()));
        object.insert("type".into(), Value::String(self.ty.clone()));

        let optional = [
            ("datacontenttype", &self.datacontenttype),
            ("dataschema", &self.dataschema),
            ("subject", &self.subject),
            ("time", &self.time),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                object.insert(name.into(), Value::String(value.clone()));
            }
        }
        for (name, value) in &self.extensions {
            object.insert(name.clone(), Value::String(value.clone()));
        }

        if let Some(data) = &self.data {
            let (key, value) = self.encode_data(data);
            object.insert(key.into(), value);
        }

        Ok(serde_json::to_vec(&Value::Object(object))?)
    }

    /// Parse the JSON event format.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut object) = value else {
            return Err(MessageError::InvalidAttribute {
                name: "event".into(),
                reason: "expected a JSON object".into(),
            });
        };

        let mut event = Event::new(
            take_required(&mut object, "id")?,
            take_required(&mut object, "source")?,
            take_required(&mut object, "type")?,
        );
        event.specversion = take_required(&mut object, "specversion")?;
        event.datacontenttype = take_optional(&mut object, "datacontenttype")?;
        event.dataschema = take_optional(&mut object, "dataschema")?;
        event.subject = take_optional(&mut object, "subject")?;
        event.time = take_optional(&mut object, "time")?;

        let data_base64 = object.remove("data_base64");
        let data = object.remove("data");
        event.data = match (data_base64, data) {
            (Some(Value::String(encoded)), _) => {
                Some(Bytes::from(general_purpose::STANDARD.decode(encoded)?))
            }
            (Some(_), _) => {
                return Err(MessageError::InvalidAttribute {
                    name: "data_base64".into(),
                    reason: "expected a string".into(),
                })
            }
            (None, Some(Value::String(text))) if !event.has_json_data() => {
                Some(Bytes::from(text))
            }
            (None, Some(value)) => Some(Bytes::from(serde_json::to_vec(&value)?)),
            (None, None) => None,
        };

        for (name, value) in object {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(MessageError::InvalidAttribute {
                        name,
                        reason: "extensions must be strings, numbers or booleans".into(),
                    })
                }
            };
            event.extensions.insert(name.to_ascii_lowercase(), value);
        }

        Ok(event)
    }

    /// Whether `data` is JSON per its content type. Absent means JSON.
    fn has_json_data(&self) -> bool {
        match &self.datacontenttype {
            None => true,
            Some(ct) => is_json_media_type(ct),
        }
    }

    fn encode_data(&self, data: &Bytes) -> (&'static str, Value) {
        if self.has_json_data() {
            if let Ok(value) = serde_json::from_slice::<Value>(data) {
                return ("data", value);
            }
        } else if self
            .datacontenttype
            .as_deref()
            .is_some_and(|ct| media_type(ct).starts_with("text/"))
        {
            if let Ok(text) = std::str::from_utf8(data) {
                return ("data", Value::String(text.to_string()));
            }
        }
        (
            "data_base64",
            Value::String(general_purpose::STANDARD.encode(data)),
        )
    }
}

fn take_required(object: &mut Map<String, Value>, name: &'static str) -> Result<String, MessageError> {
    take_optional(object, name)?.ok_or(MessageError::MissingAttribute(name))
}

fn take_optional(object: &mut Map<String, Value>, name: &'static str) -> Result<Option<String>, MessageError> {
    match object.remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(MessageError::InvalidAttribute {
            name: name.into(),
            reason: "expected a string".into(),
        }),
    }
}

/// Media type without parameters, lowercased.
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json_media_type(content_type: &str) -> bool {
    let mt = media_type(content_type);
    mt == "application/json" || mt == "text/json" || mt.ends_with("+json")
}

/// An `Event` written in a chosen encoding.
#[derive(Debug)]
pub struct EventMessage {
    event: Event,
    encoding: Encoding,
    finished: AtomicBool,
}

impl EventMessage {
    /// Write the event as a JSON document body.
    pub fn structured(event: Event) -> Self {
        Self::with_encoding(event, Encoding::Structured)
    }

    /// Write attributes as `ce-*` headers and the data as body.
    pub fn binary(event: Event) -> Self {
        Self::with_encoding(event, Encoding::Binary)
    }

    fn with_encoding(event: Event, encoding: Encoding) -> Self {
        Self {
            event,
            encoding,
            finished: AtomicBool::new(false),
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    fn write_binary(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError> {
        let event = &self.event;
        let mut attributes: Vec<(&str, &str)> = vec![
            ("specversion", event.specversion.as_str()),
            ("id", event.id.as_str()),
            ("source", event.source.as_str()),
            ("type", event.ty.as_str()),
        ];
        for (name, value) in [
            ("dataschema", &event.dataschema),
            ("subject", &event.subject),
            ("time", &event.time),
        ] {
            if let Some(value) = value {
                attributes.push((name, value.as_str()));
            }
        }
        for (name, value) in &event.extensions {
            if RESERVED.contains(&name.as_str()) {
                continue;
            }
            attributes.push((name.as_str(), value.as_str()));
        }

        for (name, value) in attributes {
            let header = format!("{}{}", ATTRIBUTE_PREFIX, name);
            let header_name = HeaderName::from_bytes(header.as_bytes())
                .map_err(|_| MessageError::InvalidHeader(header.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| MessageError::InvalidHeader(header))?;
            headers.insert(header_name, header_value);
        }

        if let Some(ct) = &event.datacontenttype {
            let value = HeaderValue::from_str(ct)
                .map_err(|_| MessageError::InvalidHeader(CONTENT_TYPE.to_string()))?;
            headers.insert(CONTENT_TYPE, value);
        }

        Ok(event.data.clone().unwrap_or_default())
    }
}

impl Message for EventMessage {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn write_http(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError> {
        match self.encoding {
            Encoding::Structured => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
                );
                Ok(Bytes::from(self.event.to_json()?))
            }
            Encoding::Binary => self.write_binary(headers),
            Encoding::Unknown => Err(MessageError::UnknownEncoding),
        }
    }

    fn finish(&self) -> Result<(), MessageError> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(MessageError::AlreadyFinished);
        }
        Ok(())
    }
}
