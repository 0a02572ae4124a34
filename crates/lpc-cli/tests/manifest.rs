//! `cargo run` at the workspace root must find the `lpcls` binary.

const WORKSPACE_MANIFEST: &str = include_str!("../../../Cargo.toml");
const CLI_MANIFEST: &str = include_str!("../Cargo.toml");

#[test]
fn test_default_run_names_the_cli_binary() {
    let workspace: toml::Table = WORKSPACE_MANIFEST.parse().unwrap();
    let cli: toml::Table = CLI_MANIFEST.parse().unwrap();

    let default_run = workspace["workspace"]["metadata"]["default-run"].as_str();
    let bins: Vec<&str> = cli["bin"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|bin| bin["name"].as_str())
        .collect();
    assert_eq!(bins, vec!["lpcls"]);
    assert_eq!(default_run, Some("lpcls"));
}
