use assert_cmd::Command;
use std::fs;
use std::path::Path;

macro_rules! jack_test {
    ($name:tt) => {
        #[test]
        fn $name() {
            let data = Path::new("test_data");
            let expected = fs::read_to_string(data.join(concat!(stringify!($name), ".vm")))
                .expect("Failed to read expected output");

            // Compile a copy so the produced .vm file lands outside the
            // source tree.
            let dir = std::env::temp_dir().join(concat!("jackc_", stringify!($name)));
            fs::create_dir_all(&dir).expect("Failed to create temp dir");
            let input = dir.join(concat!(stringify!($name), ".jack"));
            fs::copy(data.join(concat!(stringify!($name), ".jack")), &input)
                .expect("Failed to copy input");

            Command::cargo_bin(env!("CARGO_PKG_NAME"))
                .unwrap()
                .arg(input.to_str().unwrap())
                .assert()
                .success();

            let produced = fs::read_to_string(dir.join(concat!(stringify!($name), ".vm")))
                .expect("Failed to read produced output");
            assert_eq!(produced, expected);
        }
    };
}

jack_test!(seven);
jack_test!(counter);
jack_test!(arrays);
jack_test!(flow);

#[test]
fn failed_unit_leaves_no_output() {
    let dir = std::env::temp_dir().join("jackc_bad_unit");
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let input = dir.join("bad.jack");
    fs::write(&input, "class Bad { function void main() { let ghost = 1; return; } }")
        .expect("Failed to write input");
    let output = dir.join("bad.vm");
    let _ = fs::remove_file(&output);

    Command::cargo_bin(env!("CARGO_PKG_NAME"))
        .unwrap()
        .arg(input.to_str().unwrap())
        .assert()
        .failure();

    assert!(!output.exists(), "failed unit must not produce a .vm file");
}
