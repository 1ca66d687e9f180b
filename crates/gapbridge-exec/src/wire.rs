// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform wire encodings of the logical command.
//
// The command shape never changes; only how a host wants it spelled:
//
//   Json    {"service":"Device","action":"getDeviceInfo","callbackId":"Device7","args":[]}
//   Slash   Device/getDeviceInfo/Device7/[]
//   GapUrl  gap://Device.getDeviceInfo/Device7/arg1/arg2?key=value
//
// Synchronous replies come back as a JSON result object, or an empty string
// when the answer will be delivered later.

use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::types::{Command, CommandResult};
use serde_json::Value as Json;

use crate::traits::NativeReply;

/// How a transport spells outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Slash,
    GapUrl,
}

impl WireFormat {
    pub fn encode(self, command: &Command) -> Result<String> {
        match self {
            Self::Json => encode_json(command),
            Self::Slash => encode_slash(command),
            Self::GapUrl => Ok(encode_gap_url(command)),
        }
    }

    pub fn decode(self, raw: &str) -> Result<Command> {
        match self {
            Self::Json => decode_json(raw),
            Self::Slash => decode_slash(raw),
            Self::GapUrl => Err(BridgeError::MalformedCommand(
                "gap:// URLs are not decodable".into(),
            )),
        }
    }
}

pub fn encode_json(command: &Command) -> Result<String> {
    Ok(serde_json::to_string(command)?)
}

pub fn decode_json(raw: &str) -> Result<Command> {
    Ok(serde_json::from_str(raw)?)
}

/// `service/action/callbackId/<args as JSON array>`
pub fn encode_slash(command: &Command) -> Result<String> {
    Ok(format!(
        "{}/{}/{}/{}",
        command.service,
        command.action,
        command.callback_id,
        serde_json::to_string(&command.args)?
    ))
}

/// Inverse of [`encode_slash`]. The args segment may be omitted.
pub fn decode_slash(raw: &str) -> Result<Command> {
    let mut parts = raw.splitn(4, '/');
    let mut next = |what: &str| {
        parts
            .next()
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| BridgeError::MalformedCommand(format!("missing {what} in {raw:?}")))
    };
    let service = next("service")?;
    let action = next("action")?;
    let callback_id = next("callback id")?;
    let args = match parts.next() {
        Some(json) if !json.is_empty() => serde_json::from_str(json)?,
        _ => Vec::new(),
    };
    Ok(Command {
        service,
        action,
        callback_id,
        args,
    })
}

/// `gap://service.action/callbackId/seg/seg?key=value`
///
/// Scalar arguments become percent-encoded path segments. Object arguments
/// contribute their scalar properties as query parameters; nested objects
/// and nulls are dropped.
pub fn encode_gap_url(command: &Command) -> String {
    let mut segments = Vec::new();
    let mut query = Vec::new();

    for arg in &command.args {
        match arg {
            Json::Null => {}
            Json::Object(map) => {
                for (key, value) in map {
                    if let Some(text) = scalar_text(value) {
                        query.push(format!(
                            "{}={}",
                            urlencoding::encode(key),
                            urlencoding::encode(&text)
                        ));
                    }
                }
            }
            Json::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    if let Some(text) = scalar_text(value) {
                        query.push(format!("{index}={}", urlencoding::encode(&text)));
                    }
                }
            }
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    segments.push(urlencoding::encode(&text).into_owned());
                }
            }
        }
    }

    let mut url = format!(
        "gap://{}.{}/{}/{}",
        command.service,
        command.action,
        command.callback_id,
        segments.join("/")
    );
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Null | Json::Array(_) | Json::Object(_) => None,
    }
}

/// Decode what a synchronous native call returned.
pub fn parse_reply(raw: &str) -> Result<NativeReply> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(NativeReply::Pending);
    }
    let result: CommandResult = serde_json::from_str(raw)?;
    Ok(NativeReply::Immediate(result))
}

#[cfg(test)]
mod tests {
    use gapbridge_core::types::CallbackStatus;
    use serde_json::json;

    use super::*;

    fn command(args: Vec<Json>) -> Command {
        Command {
            service: "Geolocation".into(),
            action: "getLocation".into(),
            callback_id: "Geolocation12".into(),
            args,
        }
    }

    #[test]
    fn slash_encoding_appends_args_json() {
        let encoded = encode_slash(&command(vec![json!(true), json!(5000)])).expect("encode");
        assert_eq!(encoded, "Geolocation/getLocation/Geolocation12/[true,5000]");
    }

    #[test]
    fn slash_decoding_keeps_slashes_inside_args() {
        let cmd = decode_slash(r#"File/readAsText/File3/["/sdcard/a.txt","UTF-8"]"#)
            .expect("decode");
        assert_eq!(cmd.service, "File");
        assert_eq!(cmd.callback_id, "File3");
        assert_eq!(cmd.args, vec![json!("/sdcard/a.txt"), json!("UTF-8")]);

        let bare = decode_slash("Device/getDeviceInfo/Device1").expect("decode bare");
        assert!(bare.args.is_empty());
    }

    #[test]
    fn slash_decoding_rejects_missing_parts() {
        assert!(matches!(
            decode_slash("Device/"),
            Err(BridgeError::MalformedCommand(_))
        ));
    }

    #[test]
    fn gap_url_splits_scalars_and_options() {
        let url = encode_gap_url(&command(vec![
            json!("a b"),
            Json::Null,
            json!(3),
            json!({"enableHighAccuracy": true, "maximumAge": 0, "nested": {"x": 1}, "timeout": null}),
        ]));
        assert_eq!(
            url,
            "gap://Geolocation.getLocation/Geolocation12/a%20b/3?enableHighAccuracy=true&maximumAge=0"
        );
    }

    #[test]
    fn json_encoding_uses_camel_case() {
        let encoded = WireFormat::Json.encode(&command(vec![])).expect("encode");
        let value: Json = serde_json::from_str(&encoded).expect("valid json");
        assert_eq!(value["callbackId"], "Geolocation12");
    }

    #[test]
    fn empty_reply_means_pending() {
        assert_eq!(parse_reply("").expect("parse"), NativeReply::Pending);
        assert_eq!(parse_reply("  ").expect("parse"), NativeReply::Pending);
    }

    #[test]
    fn reply_json_becomes_immediate_result() {
        let reply = parse_reply(r#"{"status":9,"message":"boom"}"#).expect("parse");
        assert_eq!(
            reply,
            NativeReply::Immediate(CommandResult::error(CallbackStatus::Error, "boom"))
        );
        assert!(parse_reply("not json").is_err());
    }
}
