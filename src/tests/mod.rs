mod admin_links;
mod admin_reports;
mod invalid_json;
mod redirect;
