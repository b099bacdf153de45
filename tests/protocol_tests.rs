use aletheia_call::protocol::{
    ControlMessage, DecodeError, RemoteSessionState, SessionAction, TranscriptRole,
};

#[test]
fn test_mute_serialization() {
    let msg = ControlMessage::Mute { muted: true };

    let bytes = msg.encode().unwrap();
    let json = String::from_utf8(bytes.clone()).unwrap();
    assert!(json.contains("\"type\":\"mute\""));
    assert!(json.contains("\"muted\":true"));

    let decoded = ControlMessage::decode(&bytes).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn test_session_control_wire_format() {
    let json = String::from_utf8(
        ControlMessage::SessionControl {
            action: SessionAction::Pause,
        }
        .encode()
        .unwrap(),
    )
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "session_control");
    assert_eq!(value["action"], "pause");
}

#[test]
fn test_session_state_change_deserialization() {
    let json = br#"{"type": "session_state_change", "state": "idle"}"#;

    let msg = ControlMessage::decode(json).unwrap();
    assert_eq!(
        msg,
        ControlMessage::SessionStateChange {
            state: RemoteSessionState::Idle
        }
    );
}

#[test]
fn test_transcript_roles() {
    let user = ControlMessage::decode(
        br#"{"type": "transcript", "role": "user", "text": "I couldn't sleep"}"#,
    )
    .unwrap();
    assert_eq!(
        user,
        ControlMessage::Transcript {
            role: TranscriptRole::User,
            text: "I couldn't sleep".to_string()
        }
    );

    let assistant = ControlMessage::decode(
        br#"{"type": "transcript", "role": "assistant", "text": "What kept you up?"}"#,
    )
    .unwrap();
    assert!(matches!(
        assistant,
        ControlMessage::Transcript {
            role: TranscriptRole::Assistant,
            ..
        }
    ));
}

#[test]
fn test_speaking_with_extra_fields() {
    let msg = ControlMessage::decode(
        br#"{"type": "speaking", "speaking": false, "participant": "bot"}"#,
    )
    .unwrap();
    assert_eq!(msg, ControlMessage::Speaking { speaking: false });
}

#[test]
fn test_unknown_type_is_unrecognized() {
    let msg = ControlMessage::decode(br#"{"type": "volume", "level": 0.4}"#).unwrap();
    assert_eq!(msg, ControlMessage::Unrecognized);
    assert_eq!(msg.kind(), "unrecognized");
    assert!(msg.encode().is_err());
}

#[test]
fn test_missing_field_is_rejected() {
    let err = ControlMessage::decode(br#"{"type": "mute"}"#).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidJson(_)));
}

#[test]
fn test_invalid_state_value_is_rejected() {
    assert!(ControlMessage::decode(br#"{"type": "session_state_change", "state": "paused"}"#)
        .is_err());
}

#[test]
fn test_non_utf8_payload() {
    let err = ControlMessage::decode(&[0xc3, 0x28, 0xff]).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidUtf8(_)));
}

#[test]
fn test_non_json_payload() {
    let err = ControlMessage::decode(b"hello agent").unwrap_err();
    assert!(matches!(err, DecodeError::InvalidJson(_)));
}
