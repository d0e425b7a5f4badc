use crate::fetch::FetchedResponse;
use scraper::{ElementRef, Html, Selector};
use seedline_core::{HttpMethod, WorkItem};
use std::sync::OnceLock;
use tracing::debug;

/// Turns a fetched response into candidate work items.
pub trait ItemExtractor: Send + Sync {
    fn extract(&self, response: &FetchedResponse) -> Vec<WorkItem>;
}

/// Extracts the response URL itself plus one work item per HTML form.
///
/// Form items carry the page they were found on as `Referer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlItemExtractor;

struct FormSelectors {
    form: Selector,
    fields: Selector,
    option: Selector,
}

fn selectors() -> &'static FormSelectors {
    static SELECTORS: OnceLock<FormSelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| FormSelectors {
        form: Selector::parse("form").expect("valid form selector"),
        fields: Selector::parse("input[name], select[name], textarea[name]")
            .expect("valid field selector"),
        option: Selector::parse("option").expect("valid option selector"),
    })
}

impl HtmlItemExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_form(response: &FetchedResponse, form: &ElementRef) -> Option<WorkItem> {
        let method = form
            .value()
            .attr("method")
            .map_or(HttpMethod::Get, HttpMethod::from_form_attr);

        let action = match form.value().attr("action").map(str::trim) {
            None | Some("") => response.url.clone(),
            Some(action) => match response.url.join(action) {
                Ok(url) => url,
                Err(e) => {
                    debug!(action, error = %e, "skipping form with unparseable action");
                    return None;
                }
            },
        };

        if !matches!(action.scheme(), "http" | "https") {
            debug!(action = %action, "skipping form with non-http action");
            return None;
        }

        let mut item =
            WorkItem::new(method, action).with_header("Referer", response.url.as_str());
        for field in form.select(&selectors().fields) {
            let element = field.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            let value = match element.name() {
                "textarea" => field.text().collect::<String>(),
                "select" => Self::selected_option(&field),
                _ => element.attr("value").unwrap_or_default().to_string(),
            };
            item = item.with_field(name, value);
        }

        Some(item)
    }

    /// Value a browser would submit for a `<select>`: the selected option,
    /// else the first one.
    fn selected_option(select: &ElementRef) -> String {
        let options: Vec<ElementRef> = select.select(&selectors().option).collect();
        options
            .iter()
            .find(|opt| opt.value().attr("selected").is_some())
            .or_else(|| options.first())
            .map(|opt| match opt.value().attr("value") {
                Some(value) => value.to_string(),
                None => opt.text().collect::<String>().trim().to_string(),
            })
            .unwrap_or_default()
    }
}

impl ItemExtractor for HtmlItemExtractor {
    fn extract(&self, response: &FetchedResponse) -> Vec<WorkItem> {
        let mut items = vec![WorkItem::get(response.url.clone())];

        if !response.is_html() {
            return items;
        }

        let document = Html::parse_document(&response.body);
        items.extend(
            document
                .select(&selectors().form)
                .filter_map(|form| Self::parse_form(response, &form)),
        );

        items
    }
}
