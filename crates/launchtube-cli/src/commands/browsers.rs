use anyhow::Result;
use console::style;
use launchtube_browser::detect_browsers;

pub fn execute() -> Result<()> {
    let detected = detect_browsers();

    if detected.is_empty() {
        println!("No supported browsers found on PATH.");
        return Ok(());
    }

    println!("Detected browsers:");
    for browser in detected {
        println!(
            "  {} {:10} {}",
            style("✓").green(),
            browser.info.name,
            browser.path.display()
        );
    }
    Ok(())
}
