//! HTML rendering for the prediction form

use predictor_lib::{Constraint, FeatureField, FeatureVector, ModelSummary, FEATURES};
use std::fmt;

/// The single output region shown under the form
pub enum Notice<'a> {
    Success {
        message: &'a str,
        model: &'a ModelSummary,
    },
    Error(&'a str),
}

const STYLE: &str = "body{font-family:sans-serif;max-width:44rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:.75rem}input,select{width:100%;padding:.3rem}\
button{margin-top:1.25rem;padding:.5rem 1.5rem}\
.success{background:#e6f4ea;border:1px solid #34a853;padding:.75rem;margin-top:1rem}\
.error{background:#fce8e6;border:1px solid #d93025;padding:.75rem;margin-top:1rem}\
table{border-collapse:collapse;margin-top:.5rem}td,th{border:1px solid #ccc;padding:.2rem .5rem}";

/// Render the full page
pub fn render(title: &str, values: &FeatureVector, notice: Option<Notice<'_>>) -> String {
    Page {
        title,
        values,
        notice,
    }
    .to_string()
}

struct Page<'a> {
    title: &'a str,
    values: &'a FeatureVector,
    notice: Option<Notice<'a>>,
}

impl fmt::Display for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = escape(self.title);
        write!(
            f,
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>{title}</title><style>{STYLE}</style></head><body>\
             <h1>{title}</h1>\
             <p>Enter the characteristics of the house to predict its price.</p>\
             <form method=\"post\" action=\"/predict\">"
        )?;

        for field in &FEATURES {
            write_field(f, field, self.values.get(field))?;
        }

        f.write_str("<button type=\"submit\">Predict price</button></form>")?;

        match &self.notice {
            Some(Notice::Success { message, model }) => {
                write!(f, "<div class=\"success\" role=\"status\">{}</div>", escape(message))?;
                write_model(f, model)?;
            }
            Some(Notice::Error(message)) => {
                write!(f, "<div class=\"error\" role=\"alert\">{}</div>", escape(message))?;
            }
            None => {}
        }

        f.write_str("</body></html>")
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FeatureField, value: f64) -> fmt::Result {
    write!(
        f,
        "<label for=\"{key}\">{label} ({column})</label>",
        key = field.key,
        label = escape(field.label),
        column = field.column,
    )?;

    match field.constraint {
        Constraint::Binary => {
            let selected = value.trunc() as i64;
            write!(f, "<select id=\"{key}\" name=\"{key}\">", key = field.key)?;
            for option in [0, 1] {
                let attr = if option == selected { " selected" } else { "" };
                write!(f, "<option value=\"{option}\"{attr}>{option}</option>")?;
            }
            f.write_str("</select>")
        }
        Constraint::Minimum { min } => write!(
            f,
            "<input type=\"number\" id=\"{key}\" name=\"{key}\" value=\"{value}\" \
             min=\"{min}\" step=\"{step}\" required>",
            key = field.key,
            step = field.step(),
        ),
    }
}

fn write_model(f: &mut fmt::Formatter<'_>, model: &ModelSummary) -> fmt::Result {
    write!(
        f,
        "<h2>Model details</h2><table><tr><th>kind</th><td>{}</td></tr>",
        escape(&model.kind)
    )?;
    for (name, value) in &model.params {
        write!(f, "<tr><th>{}</th><td>{}</td></tr>", escape(name), escape(value))?;
    }
    f.write_str("</table>")
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
