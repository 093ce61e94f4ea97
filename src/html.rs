//! HTML summary page.

use std::fmt::Write;

use crate::error::Error;
use crate::store::RobotInfo;

const STYLESHEET: &str = "https://gist.githubusercontent.com/fabjan/322b61203b3e0fa36c862d331f360793/raw/c3853ef186ac0ef48070a686a0cad7007ad11341/better.css";

/// Everything shown on the index page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub title: String,
    pub robots: Vec<RobotInfo>,
    pub cheaters: Vec<RobotInfo>,
}

/// Escape text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn section(out: &mut String, heading: &str, robots: &[RobotInfo]) -> std::fmt::Result {
    writeln!(out, "<h2>{}</h2>", escape(heading))?;
    if robots.is_empty() {
        return writeln!(out, "<p><em>(no data)</em></p>");
    }

    writeln!(out, "<table>")?;
    writeln!(out, "    <tr>\n        <th>Seen</th>\n        <th>User-Agent</th>\n    </tr>")?;
    for robot in robots {
        writeln!(
            out,
            "    <tr>\n        <td>{}</td>\n        <td>{}</td>\n    </tr>",
            robot.seen,
            escape(&robot.user_agent)
        )?;
    }
    writeln!(out, "</table>")
}

/// Render the index page.
pub fn render(page: &Page) -> Result<String, Error> {
    let mut out = String::new();
    writeln!(out, "<!DOCTYPE html>\n<html>\n<head>")?;
    writeln!(out, "    <meta charset=\"UTF-8\">")?;
    writeln!(out, "    <title>{}</title>", escape(&page.title))?;
    writeln!(out, "    <link rel=\"stylesheet\" href=\"{STYLESHEET}\">")?;
    writeln!(out, "</head>\n<body>\n")?;
    section(&mut out, "Robots", &page.robots)?;
    writeln!(out)?;
    section(&mut out, "Cheaters", &page.cheaters)?;
    writeln!(out, "\n</body>\n</html>")?;
    Ok(out)
}
