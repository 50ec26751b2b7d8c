use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

// --- PaperFormat ---

#[test]
fn paper_sizes_match_presets() {
    assert_eq!(PaperFormat::A3Landscape.size(), Size::new(420.0, 297.0));
    assert_eq!(PaperFormat::A3Portrait.size(), Size::new(297.0, 420.0));
    assert_eq!(PaperFormat::A4Landscape.size(), Size::new(297.0, 210.0));
    assert_eq!(PaperFormat::A4Portrait.size(), Size::new(210.0, 297.0));
}

#[test]
fn paper_format_round_trips_through_name() {
    for format in PaperFormat::ALL {
        assert_eq!(format.to_string().parse::<PaperFormat>(), Ok(format));
    }
}

#[test]
fn paper_format_parse_is_forgiving_about_case_and_separators() {
    assert_eq!("a4-portrait".parse::<PaperFormat>(), Ok(PaperFormat::A4Portrait));
    assert_eq!(" A3_LANDSCAPE ".parse::<PaperFormat>(), Ok(PaperFormat::A3Landscape));
}

#[test]
fn unknown_paper_format_is_rejected() {
    assert_eq!(
        "Letter".parse::<PaperFormat>(),
        Err(ConfigError::UnknownFormat("Letter".to_owned()))
    );
}

// --- ClientId ---

#[test]
fn client_id_accepts_word_characters() {
    for raw in ["abc", "ABCD", "user_42", "0123456789"] {
        assert_eq!(ClientId::parse(raw).map(|id| id.to_string()), Ok(raw.to_owned()));
    }
}

#[test]
fn client_id_rejects_bad_length_or_characters() {
    for raw in ["", "ab", "01234567890", "has space", "dash-ed", "ümlaut"] {
        assert!(ClientId::parse(raw).is_err(), "{raw:?} should be rejected");
    }
}

#[test]
fn random_client_id_is_four_uppercase_letters() {
    for _ in 0..20 {
        let id = ClientId::random();
        assert_eq!(id.as_str().len(), 4);
        assert!(id.as_str().chars().all(|c| c.is_ascii_uppercase()));
        assert!(ClientId::parse(id.as_str()).is_ok());
    }
}

// --- Speed ---

#[test]
fn speed_clamps_into_range() {
    assert_eq!(Speed::clamped(0).get(), 10);
    assert_eq!(Speed::clamped(55).get(), 55);
    assert_eq!(Speed::clamped(1000).get(), 100);
    assert_eq!(Speed::clamped(-3).get(), 10);
}

#[test]
fn lenient_speed_defaults_non_numeric_to_full() {
    assert_eq!(Speed::lenient("fast").get(), 100);
    assert_eq!(Speed::lenient("").get(), 100);
    assert_eq!(Speed::lenient(" 40 ").get(), 40);
    assert_eq!(Speed::lenient("5").get(), 10);
}

#[test]
fn strict_speed_rejects_out_of_range() {
    assert_eq!("70".parse::<Speed>().map(Speed::get), Ok(70));
    assert!("9".parse::<Speed>().is_err());
    assert!("101".parse::<Speed>().is_err());
    assert!("fast".parse::<Speed>().is_err());
}

// --- PlotterConfig ---

#[test]
fn empty_lookup_yields_defaults() {
    let config = PlotterConfig::from_lookup(|_| None);
    assert_eq!(config.server_url, "wss://plotter.eu.ngrok.io");
    assert_eq!(config.format, PaperFormat::A3Landscape);
    assert_eq!(config.speed.get(), 100);
    assert!(ClientId::parse(&config.client_id).is_ok());
    assert_eq!(config.session.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.session.wait_before_reconnect, Duration::from_secs(10));
    assert_eq!(config.session.retries, -1);
}

#[test]
fn lookup_values_override_defaults() {
    let config = PlotterConfig::from_lookup(lookup_from(&[
        ("TG_PLOT_SERVER_URL", "ws://localhost:8080"),
        ("TG_PLOT_CLIENT_ID", "ZED"),
        ("TG_PLOT_FORMAT", "A4 Portrait"),
        ("TG_PLOT_SPEED", "30"),
        ("TG_PLOT_CONNECT_TIMEOUT_MS", "2500"),
        ("TG_PLOT_WAIT_BEFORE_RECONNECT_MS", "500"),
        ("TG_PLOT_RETRIES", "5"),
    ]));
    assert_eq!(config.server_url, "ws://localhost:8080");
    assert_eq!(config.client_id, "ZED");
    assert_eq!(config.format, PaperFormat::A4Portrait);
    assert_eq!(config.speed.get(), 30);
    assert_eq!(config.session.connect_timeout, Duration::from_millis(2500));
    assert_eq!(config.session.wait_before_reconnect, Duration::from_millis(500));
    assert_eq!(config.session.retries, 5);
}

#[test]
fn unparseable_values_fall_back() {
    let config = PlotterConfig::from_lookup(lookup_from(&[
        ("TG_PLOT_FORMAT", "Tabloid"),
        ("TG_PLOT_SPEED", "warp"),
        ("TG_PLOT_RETRIES", "many"),
    ]));
    assert_eq!(config.format, PaperFormat::A3Landscape);
    assert_eq!(config.speed.get(), 100);
    assert_eq!(config.session.retries, -1);
}

#[test]
fn from_env_missing_keys_use_defaults() {
    // The TG_PLOT_* keys are not set in the test environment.
    let config = PlotterConfig::from_env();
    assert!(!config.server_url.is_empty());
}
