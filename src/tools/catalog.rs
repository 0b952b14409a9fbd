use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

pub const TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "list_services",
        description: "List all configured services with their URLs and spec status",
        required: &[],
        optional: &[],
    },
    ToolSpec {
        name: "list_endpoints",
        description: "List API endpoints for a service, optionally filtered by tag or HTTP method",
        required: &["service"],
        optional: &["tag", "method"],
    },
    ToolSpec {
        name: "search_api",
        description: "Search endpoint paths, summaries, descriptions and tags across all loaded specs",
        required: &["query"],
        optional: &["service"],
    },
    ToolSpec {
        name: "get_endpoint_details",
        description: "Parameters, request body schema and responses for one endpoint (method defaults to GET)",
        required: &["service", "path"],
        optional: &["method"],
    },
    ToolSpec {
        name: "refresh_api_specs",
        description: "Re-fetch and re-parse the OpenAPI spec of one service, or all of them",
        required: &[],
        optional: &["service"],
    },
    ToolSpec {
        name: "shape_response",
        description: "Apply fields (a,b.c), filter (field:op:value with contains|eq|ne|gt|lt) and limit to a JSON payload",
        required: &["json"],
        optional: &["fields", "filter", "limit"],
    },
    ToolSpec {
        name: "call_api",
        description: "Authenticated API call to a configured service. The API version prefix is added automatically; use fields/filter/limit to reduce the response",
        required: &["service", "path"],
        optional: &["method", "query", "body", "fields", "filter", "limit"],
    },
];

pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOL_CATALOG.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_unique() {
        let mut names: Vec<_> = TOOL_CATALOG.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOL_CATALOG.len());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("call_api").unwrap().required, &["service", "path"]);
        assert!(find("scrape").is_none());
    }
}
