use tera::Tera;

pub const INDEX: &str = "index.html";
pub const QUOTE: &str = "quote.html";
pub const QUOTES: &str = "quotes.html";
pub const ADMIN: &str = "admin.html";
pub const NOT_FOUND: &str = "not_found.html";

/// Compiles the page templates embedded at build time.
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.css.html", include_str!("../../../templates/base.css.html")),
        (INDEX, include_str!("../../../templates/index.html")),
        (QUOTE, include_str!("../../../templates/quote.html")),
        (QUOTES, include_str!("../../../templates/quotes.html")),
        (ADMIN, include_str!("../../../templates/admin.html")),
        (NOT_FOUND, include_str!("../../../templates/not_found.html")),
    ])?;
    Ok(tera)
}
