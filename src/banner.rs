// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    // Using a raw string literal for the multi-line banner
    let banner = r#"
 _           _
| |  __ __ _| |_ __ _   _ _ _  _ _ _  _ _  ___ _ _
| |/ // _` |  _/ _` | | '_| || | ' \| ' \/ -_) '_|
|_|\_\\__,_|\__\__,_| |_|  \_,_|_||_|_||_\___|_|

    Practice Coding Runner
"#;
    println!("{}", banner);
}
