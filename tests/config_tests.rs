use photo_slide::config::{Configuration, OrientationSource, PowerSource, parse_hex_color};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
photo-library-path: "/photos"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/photos"));
    assert_eq!(cfg.grid.columns, 4);
    assert_eq!(cfg.slideshow.interval, Duration::from_secs(3));
    assert_eq!(cfg.power.source, PowerSource::Auto);
    assert_eq!(cfg.orientation, OrientationSource::Auto);
    assert_eq!(cfg.loader_max_concurrent_decodes, 4);
    assert!(cfg.startup_shuffle_seed.is_none());
}

#[test]
fn parse_full_config() {
    let yaml = r##"
photo-library-path: "/srv/photos"
startup-shuffle-seed: 7
loader-max-concurrent-decodes: 2
grid:
  columns: 3
  thumbnail-size: 320
  spacing: 4
  background: "#F0F0F0"
slideshow:
  interval: 10s
  transition: 1s
  background: "#101010"
power:
  source:
    type: sysfs
    path: /sys/class/power_supply/AC/online
  poll-interval: 500ms
orientation: landscape
screen-wake:
  inhibit-command: "xset s off -dpms"
  release-command: "xset s on +dpms"
"##;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.startup_shuffle_seed, Some(7));
    assert_eq!(cfg.grid.columns, 3);
    assert_eq!(cfg.grid.thumbnail_size, 320);
    assert_eq!(cfg.slideshow.interval, Duration::from_secs(10));
    assert_eq!(cfg.slideshow.transition, Duration::from_secs(1));
    assert_eq!(
        cfg.power.source,
        PowerSource::Sysfs {
            path: PathBuf::from("/sys/class/power_supply/AC/online")
        }
    );
    assert_eq!(cfg.power.poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.orientation, OrientationSource::Landscape);
    assert_eq!(
        cfg.screen_wake.inhibit_command.as_deref(),
        Some("xset s off -dpms")
    );
}

#[test]
fn parse_fixed_power_sources() {
    for (tag, expected) in [
        ("always", PowerSource::Always),
        ("never", PowerSource::Never),
        ("auto", PowerSource::Auto),
    ] {
        let yaml = format!("photo-library-path: /p\npower:\n  source:\n    type: {tag}\n");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(cfg.power.source, expected);
    }

    let yaml = r#"
photo-library-path: /p
power:
  source:
    type: command
    command: "cat /tmp/status"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.power.source,
        PowerSource::Command {
            command: "cat /tmp/status".into()
        }
    );
}

#[test]
fn rejects_unknown_keys() {
    let yaml = r#"
photo-library-path: /p
grid:
  colums: 3
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn validation_rejects_bad_values() {
    let cases = [
        "photo-library-path: /p\ngrid:\n  columns: 0\n",
        "photo-library-path: /p\ngrid:\n  background: white\n",
        "photo-library-path: /p\nslideshow:\n  interval: 1s\n  transition: 2s\n",
        "photo-library-path: /p\nloader-max-concurrent-decodes: 0\n",
        "photo-library-path: /p\npower:\n  poll-interval: 10ms\n",
        "photo-library-path: /p\npower:\n  source:\n    type: command\n    command: \"  \"\n",
        "photo-library-path: /p\nscreen-wake:\n  inhibit-command: \"\"\n",
    ];
    for yaml in cases {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err(), "expected rejection for:\n{yaml}");
    }
}

#[test]
fn background_colors_parse_as_hex() {
    let white = parse_hex_color("#FFFFFF").unwrap();
    assert!((white.red - 1.0).abs() < 1e-6);
    assert!((white.alpha - 1.0).abs() < 1e-6);
    let black = parse_hex_color("#000").unwrap();
    assert!(black.red.abs() < 1e-6);
    assert!(parse_hex_color("not-a-colour").is_none());
}

#[test]
fn loads_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "photo-library-path: /photos\norientation: portrait\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.orientation, OrientationSource::Portrait);
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}
