use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_magswipe"))
}

fn tmp_path(name: &str) -> PathBuf {
    let tmp_dir = std::env::temp_dir().join(format!("magswipe-cli-{}", std::process::id()));
    fs::create_dir_all(&tmp_dir).expect("Failed to create temp dir");
    tmp_dir.join(name)
}

fn run_magswipe(args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .output()
        .expect("Failed to execute magswipe")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_encode_writes_wav() {
    let output = tmp_path("encode.wav");
    let result = run_magswipe(&["encode", "1234", output.to_str().unwrap()]);

    assert!(result.status.success(), "encode failed: {:?}", result);
    assert!(stdout(&result).contains("Wrote"));

    let reader = hound::WavReader::open(&output).expect("Output is not a WAV file");
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.spec().channels, 1);
    assert!(reader.len() > 10_000);
}

#[test]
fn test_encode_then_decode() {
    let wav = tmp_path("roundtrip.wav");
    run_magswipe(&["encode", "4111111111111111=2512", wav.to_str().unwrap()]);

    let result = run_magswipe(&["decode", wav.to_str().unwrap()]);
    assert!(result.status.success(), "decode failed: {:?}", result);
    assert_eq!(stdout(&result).trim(), "4111111111111111=2512");
}

#[test]
fn test_decode_reversed_json() {
    let wav = tmp_path("reversed.wav");
    run_magswipe(&["encode", "1234", wav.to_str().unwrap(), "--reverse"]);

    let result = run_magswipe(&["decode", wav.to_str().unwrap(), "--json"]);
    assert!(result.status.success(), "decode failed: {:?}", result);

    let report: serde_json::Value =
        serde_json::from_str(stdout(&result).trim()).expect("Output is not JSON");
    assert_eq!(report["ok"], true);
    assert_eq!(report["track"], "1234");
    assert_eq!(report["orientation"], "reverse");
}

#[test]
fn test_decode_silence_fails() {
    let wav = tmp_path("silence.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
    for _ in 0..44100 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let result = run_magswipe(&["decode", wav.to_str().unwrap()]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("No bits were found"));
}

#[test]
fn test_listen_decodes_piped_pcm() {
    let wav = tmp_path("listen.wav");
    run_magswipe(&["encode", "5555", wav.to_str().unwrap()]);
    let swipe: Vec<i16> = hound::WavReader::open(&wav)
        .unwrap()
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .unwrap();

    // Quiet floor around the swipe so the detector can learn the baseline
    let floor = |len: usize| (0..len).map(|i| if i % 2 == 0 { 15i16 } else { -15 });
    let pcm: Vec<u8> = floor(60_000)
        .chain(swipe.iter().copied())
        .chain(floor(30_000))
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let mut child = Command::new(binary())
        .arg("listen")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn magswipe");
    // Closing stdin ends the listen loop
    child.stdin.take().unwrap().write_all(&pcm).unwrap();
    let result = child.wait_with_output().unwrap();

    assert!(result.status.success(), "listen failed: {:?}", result);
    assert_eq!(stdout(&result).trim(), "5555");
}

#[test]
fn test_listen_survives_overlong_burst() {
    let wav = tmp_path("burst.wav");
    run_magswipe(&["encode", "5555", wav.to_str().unwrap()]);
    let swipe: Vec<i16> = hound::WavReader::open(&wav)
        .unwrap()
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .unwrap();

    let floor = |len: usize| (0..len).map(|i| if i % 2 == 0 { 15i16 } else { -15 });
    // Over ten seconds of loud hum, longer than any swipe may be
    let burst = (0..500_000).map(|i| if i % 2 == 0 { 5000i16 } else { -5000 });
    let pcm: Vec<u8> = floor(60_000)
        .chain(burst)
        .chain(floor(60_000))
        .chain(swipe.iter().copied())
        .chain(floor(30_000))
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let mut child = Command::new(binary())
        .arg("listen")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn magswipe");
    child.stdin.take().unwrap().write_all(&pcm).unwrap();
    let result = child.wait_with_output().unwrap();

    assert!(result.status.success(), "listen failed: {:?}", result);
    assert!(String::from_utf8_lossy(&result.stderr).contains("Swipe exceeded"));
    assert_eq!(stdout(&result).trim(), "5555");
}

#[test]
fn test_encode_rejects_bad_data() {
    let wav = tmp_path("bad.wav");
    let result = run_magswipe(&["encode", "12AB", wav.to_str().unwrap()]);
    assert!(!result.status.success());
}
