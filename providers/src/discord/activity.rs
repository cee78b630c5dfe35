//! `SET_ACTIVITY` request bodies.

use presence_types::ActivityPayload;
use serde_json::{Map, Value, json};

/// Build the `activity` object. Empty strings are omitted: the service
/// rejects empty fields instead of ignoring them.
pub(crate) fn activity_json(payload: &ActivityPayload) -> Value {
    let mut activity = Map::new();
    insert_non_empty(&mut activity, "state", &payload.state);
    insert_non_empty(&mut activity, "details", &payload.details);

    if let Some(start) = payload.start_timestamp {
        activity.insert("timestamps".to_string(), json!({ "start": start }));
    }

    let mut assets = Map::new();
    if let Some(large) = &payload.large {
        insert_non_empty(&mut assets, "large_image", &large.image);
        insert_non_empty(&mut assets, "large_text", &large.text);
    }
    if let Some(small) = &payload.small {
        insert_non_empty(&mut assets, "small_image", &small.image);
        insert_non_empty(&mut assets, "small_text", &small.text);
    }
    if !assets.is_empty() {
        activity.insert("assets".to_string(), Value::Object(assets));
    }

    if let Some(button) = &payload.button {
        activity.insert(
            "buttons".to_string(),
            json!([{ "label": button.label, "url": button.url }]),
        );
    }

    Value::Object(activity)
}

/// Full command frame; `activity: None` clears the presence.
pub(crate) fn set_activity_command(activity: Option<Value>, pid: u32, nonce: &str) -> Value {
    let mut args = Map::new();
    args.insert("pid".to_string(), json!(pid));
    if let Some(activity) = activity {
        args.insert("activity".to_string(), activity);
    }
    json!({
        "cmd": "SET_ACTIVITY",
        "args": Value::Object(args),
        "nonce": nonce,
    })
}

fn insert_non_empty(map: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use presence_types::{Button, ImagePair};

    use super::*;

    #[test]
    fn full_payload_maps_every_field() {
        let payload = ActivityPayload {
            state: "Editing main.rs".to_string(),
            details: "In proj (main)".to_string(),
            large: Some(ImagePair::new("https://x/neovim.png", "neovim")),
            small: Some(ImagePair::new("https://x/rust.png", "Coding in rust")),
            start_timestamp: Some(1_700_000_000),
            button: Some(Button {
                label: "View Repository".to_string(),
                url: "https://github.com/o/r".to_string(),
            }),
        };

        let value = activity_json(&payload);
        assert_eq!(value["state"], "Editing main.rs");
        assert_eq!(value["details"], "In proj (main)");
        assert_eq!(value["timestamps"]["start"], 1_700_000_000);
        assert_eq!(value["assets"]["large_image"], "https://x/neovim.png");
        assert_eq!(value["assets"]["small_text"], "Coding in rust");
        assert_eq!(value["buttons"][0]["label"], "View Repository");
    }

    #[test]
    fn suppressed_slots_and_empty_fields_are_omitted() {
        let payload = ActivityPayload {
            state: "Idle in helix".to_string(),
            large: Some(ImagePair::new("https://x/helix.png", "")),
            ..Default::default()
        };

        let value = activity_json(&payload);
        assert!(value.get("details").is_none());
        assert!(value.get("timestamps").is_none());
        assert!(value.get("buttons").is_none());
        assert!(value["assets"].get("small_image").is_none());
        assert!(value["assets"].get("large_text").is_none());
    }

    #[test]
    fn clear_command_has_no_activity() {
        let cmd = set_activity_command(None, 42, "n");
        assert_eq!(cmd["cmd"], "SET_ACTIVITY");
        assert_eq!(cmd["args"]["pid"], 42);
        assert!(cmd["args"].get("activity").is_none());
        assert_eq!(cmd["nonce"], "n");
    }
}
