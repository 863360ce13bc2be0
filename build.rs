use std::fs;

const DEFAULT_CONFIG: &str = "src/default_config.toml";

fn main() {
    println!("cargo:rerun-if-changed={DEFAULT_CONFIG}");

    let content = fs::read_to_string(DEFAULT_CONFIG).expect("default config is readable");
    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid {DEFAULT_CONFIG}: {e}"),
    };

    let Some(upload) = table.get("upload").and_then(toml::Value::as_table) else {
        panic!("{DEFAULT_CONFIG} has no [upload] table");
    };
    if let Some(size) = upload.get("batch_size").and_then(toml::Value::as_integer) {
        assert!(
            (1..=100).contains(&size),
            "{DEFAULT_CONFIG}: batch_size {size} is outside 1..=100"
        );
    }
}
