use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SEQUENCE: &str = r##"[
  { "stops": [{ "colour": "#ffffff", "distance": 0.0 },
              { "colour": "#000000", "distance": 1.0 }],
    "fade": 1000, "hold": 500 },
  { "stops": [{ "color": "#ff0000", "distance": 0.0 },
              { "color": "#0000ff", "distance": 1.0 }],
    "fade": "2s" }
]"##;

fn write_sequence(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("sequence.json");
    fs::write(&path, SEQUENCE).unwrap();
    path
}

fn turrell_glow(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_turrell-glow"))
        .env("TURRELL_GLOW_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run turrell-glow")
}

#[test]
fn export_writes_a_png_of_the_requested_size() {
    let root = TempDir::new().unwrap();
    let sequence = write_sequence(root.path());
    let out = root.path().join("frame.png");

    let output = turrell_glow(
        root.path(),
        &[
            sequence.to_str().unwrap(),
            "--export",
            out.to_str().unwrap(),
            "--size",
            "64x32",
            "--time",
            "400",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let image = image::open(&out).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (64, 32));
    // The glow is brightest at the centre of the field.
    let centre = image.get_pixel(32, 16);
    let corner = image.get_pixel(0, 0);
    let luma = |p: &image::Rgba<u8>| p[0] as u32 + p[1] as u32 + p[2] as u32;
    assert!(luma(centre) > luma(corner));
    assert_eq!(centre[3], 255);
}

#[test]
fn export_uses_settings_and_default_sequence_from_config_dir() {
    let root = TempDir::new().unwrap();
    write_sequence(root.path());
    fs::write(
        root.path().join("settings.toml"),
        "[window]\nsize = \"40x20\"\n\n[engine]\nmax_stops = 2\n",
    )
    .unwrap();
    let out = root.path().join("frame.png");

    let output = turrell_glow(root.path(), &["--export", out.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let image = image::open(&out).unwrap();
    assert_eq!((image.width(), image.height()), (40, 20));
}

#[test]
fn invalid_engine_options_are_rejected() {
    let root = TempDir::new().unwrap();
    let sequence = write_sequence(root.path());
    let out = root.path().join("frame.png");

    let output = turrell_glow(
        root.path(),
        &[
            sequence.to_str().unwrap(),
            "--export",
            out.to_str().unwrap(),
            "--max-stops",
            "17",
        ],
    );
    assert!(!output.status.success());
    assert!(!out.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_stops"), "stderr: {stderr}");
}

#[test]
fn check_summarises_a_valid_sequence() {
    let root = TempDir::new().unwrap();
    let sequence = write_sequence(root.path());

    let output = turrell_glow(root.path(), &["check", sequence.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok"), "stdout: {stdout}");
    assert!(stdout.contains("steps: 2"), "stdout: {stdout}");
    assert!(stdout.contains("#ff0000 -> #0000ff"), "stdout: {stdout}");
}

#[test]
fn check_rejects_a_malformed_colour() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("bad.json");
    fs::write(
        &path,
        r##"[{ "stops": [{ "colour": "#12345", "distance": 0.0 }], "fade": 1000 }]"##,
    )
    .unwrap();

    let output = turrell_glow(root.path(), &["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("#12345"), "stderr: {stderr}");
}

#[test]
fn check_rejects_an_empty_sequence() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("empty.json");
    fs::write(&path, "[]").unwrap();

    let output = turrell_glow(root.path(), &["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn where_prints_the_config_override() {
    let root = TempDir::new().unwrap();
    let output = turrell_glow(root.path(), &["where"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&root.path().join("settings.toml").display().to_string()),
        "stdout: {stdout}"
    );
}
