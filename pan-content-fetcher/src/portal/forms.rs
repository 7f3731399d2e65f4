use scraper::{Html, Selector};
use url::Url;

/// A parsed HTML form: the resolved submit target plus its input fields in
/// document order.
#[derive(Debug, Clone)]
pub struct PortalForm {
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

impl PortalForm {
    /// Extract the first form on the page, the way a scripted browser picks
    /// `form nr=0`. The action resolves relative to the page URL and falls
    /// back to the page itself when absent; field values default to the
    /// empty string.
    pub fn first_on_page(html: &str, page_url: &Url) -> Option<Self> {
        let document = Html::parse_document(html);
        let form_selector = Selector::parse("form").expect("valid form selector");
        let input_selector = Selector::parse("input[name]").expect("valid input selector");

        let form = document.select(&form_selector).next()?;

        let action = form
            .value()
            .attr("action")
            .and_then(|action| page_url.join(action).ok())
            .unwrap_or_else(|| page_url.clone());

        let fields = form
            .select(&input_selector)
            .map(|input| {
                let name = input.value().attr("name").unwrap_or_default().to_owned();
                let value = input.value().attr("value").unwrap_or_default().to_owned();
                (name, value)
            })
            .collect();

        Some(Self { action, fields })
    }

    /// Replace a field's value, adding the field when the form lacks it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// All hyperlink targets on the page, resolved absolute, in document order.
pub fn outbound_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").expect("valid anchor selector");

    document
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| page_url.join(href).ok())
        .collect()
}
