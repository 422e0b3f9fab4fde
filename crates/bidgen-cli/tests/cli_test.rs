use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_init_validate_and_generate() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    cargo_bin_cmd!("bidgen")
        .args(["init", root, "--name", "adapters"])
        .assert()
        .success();

    assert!(dir.path().join("bidgen.yaml").exists());
    assert!(dir.path().join("bidders/example.yaml").exists());

    cargo_bin_cmd!("bidgen")
        .args(["--config", root, "validate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("bidder descriptions are valid"));

    cargo_bin_cmd!("bidgen")
        .args(["--config", root, "generate"])
        .assert()
        .success();

    let bidder = dir
        .path()
        .join("src/main/java/org/prebid/server/bidder/example/ExampleBidder.java");
    let java = std::fs::read_to_string(&bidder).unwrap();
    assert!(java.contains("public class ExampleBidder extends OpenrtbBidder<ExtImpExample> {"));
    assert!(java.contains("impBuilder.tagid(impExt.getPlacementId());"));
    assert!(java.contains("final ExtImpExample impExt = impsWithExts.get(0).getImpExt();"));

    assert!(
        dir.path()
            .join("src/test/java/org/prebid/server/bidder/example/ExampleBidderTest.java")
            .exists()
    );
    assert!(
        dir.path()
            .join("src/main/java/org/prebid/server/proto/openrtb/ext/request/example/ExtImpExample.java")
            .exists()
    );
    assert!(dir.path().join("src/main/resources/bidder-config/example.yaml").exists());

    // Second run leaves everything in place
    cargo_bin_cmd!("bidgen")
        .args(["--config", root, "generate", "--bidder", "example"])
        .assert()
        .success()
        .stderr(predicate::str::contains("wrote 0, 5 unchanged"));
}

#[test]
fn test_show_prints_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    cargo_bin_cmd!("bidgen").args(["init", root]).assert().success();

    cargo_bin_cmd!("bidgen")
        .args(["--config", root, "show", "example", "--file", "ExtImpExample.java"])
        .assert()
        .success()
        .stdout(predicate::str::contains("public class ExtImpExample {"))
        .stdout(predicate::str::contains("ExampleBidder").not());
}

#[test]
fn test_validate_reports_bad_transformation() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    cargo_bin_cmd!("bidgen").args(["init", root]).assert().success();
    std::fs::write(
        dir.path().join("bidders/broken.yaml"),
        "bidderName: broken\nproperties:\n  endpointUrl: https://broken\ntransformations:\n  - target: imp.banner.format.w\n    staticValue: 1\n",
    )
    .unwrap();

    cargo_bin_cmd!("bidgen")
        .args(["--config", root, "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("imp.banner.format.w"))
        .stderr(predicate::str::contains("1 of 2 bidder descriptions are invalid"));
}

#[test]
fn test_init_refuses_existing_project() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();

    cargo_bin_cmd!("bidgen").args(["init", root]).assert().success();
    cargo_bin_cmd!("bidgen")
        .args(["init", root])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already contains a bidgen.yaml"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("bidgen")
        .args(["--config", dir.path().to_str().unwrap(), "generate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
