//! Query string parameters for the course routes.

use serde::Deserialize;

use crate::common::PageParams;
use crate::domains::courses::models::{CourseFilter, CourseStatus};

/// `GET /courses` query: `statuses` may repeat, so it is parsed from the
/// raw query string rather than through a flat struct.
#[derive(Debug, Clone, Default)]
pub struct ListCoursesParams {
    pub filter: CourseFilter,
    pub page: PageParams,
}

impl ListCoursesParams {
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        let mut params = ListCoursesParams::default();
        let Some(raw) = raw else {
            return Ok(params);
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "statuses" | "status" => {
                    let status = value
                        .parse::<CourseStatus>()
                        .map_err(|_| format!("invalid status: {value}"))?;
                    if !params.filter.statuses.contains(&status) {
                        params.filter.statuses.push(status);
                    }
                }
                "search" => {
                    if value.is_empty() {
                        return Err("search must not be empty".to_string());
                    }
                    params.filter.search = Some(value.into_owned());
                }
                "limit" => {
                    params.page.limit = Some(
                        value
                            .parse()
                            .map_err(|_| "limit must be an integer".to_string())?,
                    );
                }
                "offset" => {
                    params.page.offset = Some(
                        value
                            .parse()
                            .map_err(|_| "offset must be an integer".to_string())?,
                    );
                }
                _ => {}
            }
        }

        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RegenerateParams {
    /// Delete existing modules before regenerating
    #[serde(default)]
    pub clear: bool,
    /// Revoke a running job instead of answering 409
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Md,
    Zip,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub fmt: ExportFormat,
    /// Base filename without extension
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_uses_defaults() {
        let params = ListCoursesParams::parse(None).unwrap();
        assert!(params.filter.statuses.is_empty());
        assert!(params.filter.search.is_none());
        assert!(params.page.limit.is_none());
    }

    #[test]
    fn repeated_statuses_collect() {
        let params =
            ListCoursesParams::parse(Some("statuses=ready&statuses=failed&statuses=ready")).unwrap();
        assert_eq!(
            params.filter.statuses,
            vec![CourseStatus::Ready, CourseStatus::Failed]
        );
    }

    #[test]
    fn search_and_paging() {
        let params = ListCoursesParams::parse(Some("search=rust%20basics&limit=10&offset=20")).unwrap();
        assert_eq!(params.filter.search.as_deref(), Some("rust basics"));
        assert_eq!(params.page.limit, Some(10));
        assert_eq!(params.page.offset, Some(20));
    }

    #[test]
    fn bad_values_rejected() {
        assert!(ListCoursesParams::parse(Some("statuses=done")).is_err());
        assert!(ListCoursesParams::parse(Some("limit=ten")).is_err());
        assert!(ListCoursesParams::parse(Some("search=")).is_err());
    }

    #[test]
    fn export_format_parses_lowercase() {
        let params: ExportParams = serde_json::from_str(r#"{"fmt": "zip"}"#).unwrap();
        assert_eq!(params.fmt, ExportFormat::Zip);
        let defaults: ExportParams = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults.fmt, ExportFormat::Md);
    }
}
