use super::*;

fn sample_plot() -> Outbound {
    Outbound::Plot(PlotRequest {
        client: "ABCD".to_owned(),
        id: "job-1".to_owned(),
        document: "<svg/>".to_owned(),
        stats: JobStats {
            count: 2,
            out_of_bounds_count: 0,
            short_count: 1,
            travel_total: 20.5,
            travel_ink: 20.0,
            travel_blank: 0.5,
        },
        timestamp: "20260101_120000.000_UTC+0".to_owned(),
        digest: "abc123".to_owned(),
        speed: 80,
        format: "A3 Landscape".to_owned(),
        size: [420.0, 297.0],
    })
}

#[test]
fn plot_message_is_tagged_and_flat() {
    let text = encode_outbound(&sample_plot()).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["type"], "plot");
    assert_eq!(value["client"], "ABCD");
    assert_eq!(value["document"], "<svg/>");
    assert_eq!(value["digest"], "abc123");
    assert_eq!(value["speed"], 80);
    assert_eq!(value["size"], serde_json::json!([420.0, 297.0]));
}

#[test]
fn plot_stats_use_worker_field_names() {
    let text = encode_outbound(&sample_plot()).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    let stats = &value["stats"];
    assert_eq!(stats["oob_count"], 0);
    assert_eq!(stats["travel"], 20.5);
    assert!(stats.get("travel_total").is_none());
    assert!(stats.get("out_of_bounds_count").is_none());
}

#[test]
fn cancel_message_carries_only_client() {
    let text = encode_outbound(&Outbound::Cancel { client: "ABCD".to_owned() }).expect("encode");
    assert_eq!(text, r#"{"type":"cancel","client":"ABCD"}"#);
}

#[test]
fn worker_decodes_what_client_encodes() {
    let message = sample_plot();
    let text = encode_outbound(&message).expect("encode");
    assert_eq!(decode_outbound(&text).expect("decode"), message);
}

#[test]
fn decode_inbound_error() {
    let msg = decode_inbound(r#"{"type":"error","msg":"paper jam"}"#).expect("decode");
    assert_eq!(msg, Inbound::Error { msg: "paper jam".to_owned() });
}

#[test]
fn decode_inbound_queue_messages() {
    assert_eq!(
        decode_inbound(r#"{"type":"queue_length","length":3}"#).expect("decode"),
        Inbound::QueueLength { length: 3 }
    );
    assert_eq!(
        decode_inbound(r#"{"type":"queue_position","position":-1}"#).expect("decode"),
        Inbound::QueuePosition { position: -1 }
    );
}

#[test]
fn decode_inbound_terminal_messages() {
    assert_eq!(decode_inbound(r#"{"type":"job_done"}"#).expect("decode"), Inbound::JobDone);
    assert_eq!(
        decode_inbound(r#"{"type":"job_canceled"}"#).expect("decode"),
        Inbound::JobCanceled
    );
}

#[test]
fn decode_inbound_ignores_unknown_fields() {
    let msg = decode_inbound(r#"{"type":"job_done","client":"ABCD","extra":true}"#).expect("decode");
    assert_eq!(msg, Inbound::JobDone);
}

#[test]
fn decode_inbound_rejects_unknown_type() {
    let err = decode_inbound(r#"{"type":"reboot"}"#).expect_err("unknown type");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_inbound_rejects_malformed_json() {
    let err = decode_inbound("not json").expect_err("malformed");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn encode_inbound_matches_worker_format() {
    let text = encode_inbound(&Inbound::QueuePosition { position: 2 }).expect("encode");
    assert_eq!(text, r#"{"type":"queue_position","position":2}"#);
}

#[test]
fn queue_position_from_raw() {
    assert_eq!(QueuePosition::from_raw(-1), Some(QueuePosition::Drawing));
    assert_eq!(QueuePosition::from_raw(0), Some(QueuePosition::Waiting(0)));
    assert_eq!(QueuePosition::from_raw(7), Some(QueuePosition::Waiting(7)));
    assert_eq!(QueuePosition::from_raw(-2), None);
    assert_eq!(QueuePosition::from_raw(i64::MAX), None);
}

#[test]
fn queue_position_as_raw_inverts_from_raw() {
    for raw in [-1, 0, 1, 42] {
        let pos = QueuePosition::from_raw(raw).expect("valid");
        assert_eq!(pos.as_raw(), raw);
    }
}
