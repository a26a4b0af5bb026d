// =============================================================================
// GOOGLE SHEETS CLIENT
// =============================================================================
//
// A thin client over the Sheets API v4 REST endpoints. It only knows about
// worksheets, A1 ranges and rows of strings; the booking layout on top of it
// lives in `infra::booking::sheets_store`.
//
// Every call fetches a bearer token from the AccessTokenSource (cached there)
// and turns any non-2xx answer into `SheetsError::Api`.

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::service_account::{AccessTokenSource, AuthError};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Title and grid size of one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

// =============================================================================
// API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetPropertiesWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesWire {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SheetsClient {
    client: Client,
    auth: Arc<dyn AccessTokenSource>,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(auth: Arc<dyn AccessTokenSource>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/{id}/{tail...}`, each tail part percent-encoded
    /// as one path segment.
    fn url(&self, tail: &[&str]) -> Result<Url, SheetsError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, %body, "Sheets API call failed");
            return Err(SheetsError::Api { status, body });
        }
        Ok(response)
    }

    /// Properties of every worksheet in the spreadsheet.
    pub async fn sheet_properties(&self) -> Result<Vec<SheetProperties>, SheetsError> {
        let url = self.url(&[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties")]);
        let spreadsheet: Spreadsheet = self.send(request).await?.json().await?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|sheet| SheetProperties {
                sheet_id: sheet.properties.sheet_id,
                title: sheet.properties.title,
                row_count: sheet.properties.grid_properties.row_count,
                column_count: sheet.properties.grid_properties.column_count,
            })
            .collect())
    }

    pub async fn add_sheet(
        &self,
        title: &str,
        row_count: u32,
        column_count: u32,
    ) -> Result<(), SheetsError> {
        self.batch_update(json!([{
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": row_count, "columnCount": column_count }
                }
            }
        }]))
        .await?;
        tracing::info!(title, "Added worksheet");
        Ok(())
    }

    pub async fn set_column_count(&self, sheet_id: i64, column_count: u32) -> Result<(), SheetsError> {
        self.batch_update(json!([{
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "columnCount": column_count }
                },
                "fields": "gridProperties.columnCount"
            }
        }]))
        .await?;
        Ok(())
    }

    async fn batch_update(&self, requests: Value) -> Result<Vec<Value>, SheetsError> {
        let url = self.url(&[])?;
        // `{id}:batchUpdate` is part of the id segment
        let url = Url::parse(&format!("{}:batchUpdate", url))
            .map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        let request = self
            .client
            .post(url)
            .json(&json!({ "requests": requests }));
        let response: BatchUpdateResponse = self.send(request).await?.json().await?;
        Ok(response.replies)
    }

    /// Reads one range. Trailing empty cells and rows are not returned by the API.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.url(&["values", range])?;
        let value_range: ValueRange = self.send(self.client.get(url)).await?.json().await?;
        Ok(stringify_rows(value_range.values))
    }

    /// Reads several ranges in one call, in the order given.
    pub async fn batch_get(&self, ranges: &[String]) -> Result<Vec<Vec<Vec<String>>>, SheetsError> {
        let url = self.url(&["values:batchGet"])?;
        let query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        let response: BatchGetResponse = self
            .send(self.client.get(url).query(&query))
            .await?
            .json()
            .await?;
        Ok(response
            .value_ranges
            .into_iter()
            .map(|vr| stringify_rows(vr.values))
            .collect())
    }

    /// Overwrites one range with raw (unparsed) values.
    pub async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetsError> {
        let url = self.url(&["values", range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": rows }));
        self.send(request).await?;
        Ok(())
    }

    /// Overwrites several ranges in one call.
    pub async fn batch_update_values(
        &self,
        data: Vec<(String, Vec<Vec<String>>)>,
    ) -> Result<(), SheetsError> {
        if data.is_empty() {
            return Ok(());
        }
        let url = self.url(&["values:batchUpdate"])?;
        let data: Vec<Value> = data
            .into_iter()
            .map(|(range, values)| json!({ "range": range, "majorDimension": "ROWS", "values": values }))
            .collect();
        let request = self
            .client
            .post(url)
            .json(&json!({ "valueInputOption": "RAW", "data": data }));
        self.send(request).await?;
        Ok(())
    }

    /// Appends rows after the last row of the table found in `range`.
    pub async fn append_rows(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetsError> {
        let segment = format!("{}:append", range);
        let url = self.url(&["values", segment.as_str()])?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": rows }));
        self.send(request).await?;
        Ok(())
    }
}

fn stringify_rows(rows: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(stringify_cell).collect())
        .collect()
}

fn stringify_cell(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) struct StaticToken;

    #[async_trait]
    impl AccessTokenSource for StaticToken {
        async fn access_token(&self) -> Result<String, AuthError> {
            Ok("test-token".to_string())
        }
    }

    pub(crate) fn client_for(server: &MockServer) -> SheetsClient {
        SheetsClient::new(Arc::new(StaticToken), "sheet-1").with_base_url(server.uri())
    }

    #[test]
    fn cells_are_stringified() {
        let rows = stringify_rows(vec![vec![json!("a"), json!(7), json!(null), json!(true)]]);
        assert_eq!(rows, vec![vec!["a", "7", "", "true"]]);
    }

    #[tokio::test]
    async fn reads_values_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Rooms'!A:D"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Rooms!A1:D2",
                "majorDimension": "ROWS",
                "values": [["room_id", "room_type"], ["S-01", "small", 2, 3]]
            })))
            .mount(&server)
            .await;

        let rows = client_for(&server).get_values("'Rooms'!A:D").await.unwrap();
        assert_eq!(rows[1], vec!["S-01", "small", "2", "3"]);
    }

    #[tokio::test]
    async fn empty_range_reads_as_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "range": "Rooms!A1:D1" })))
            .mount(&server)
            .await;

        let rows = client_for(&server).get_values("'Rooms'!A:D").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn lists_sheet_properties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1"))
            .and(query_param("fields", "sheets.properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sheets": [
                    { "properties": { "sheetId": 0, "title": "Rooms",
                      "gridProperties": { "rowCount": 1000, "columnCount": 26 } } },
                    { "properties": { "sheetId": 42, "title": "Schedule",
                      "gridProperties": { "rowCount": 1000, "columnCount": 27 } } }
                ]
            })))
            .mount(&server)
            .await;

        let sheets = client_for(&server).sheet_properties().await.unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(
            sheets[1],
            SheetProperties {
                sheet_id: 42,
                title: "Schedule".to_string(),
                row_count: 1000,
                column_count: 27,
            }
        );
    }

    #[tokio::test]
    async fn appends_rows_as_raw_inserted_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Bookings'!A:J:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .and(body_partial_json(json!({ "values": [["BKG-0000000001", "1234567"]] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .append_rows(
                "'Bookings'!A:J",
                vec![vec!["BKG-0000000001".to_string(), "1234567".to_string()]],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn batch_update_sends_every_range() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
            .and(body_partial_json(json!({
                "valueInputOption": "RAW",
                "data": [
                    { "range": "'Schedule'!D2:E2", "values": [["HOLD:PENDING", "HOLD:PENDING"]] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .batch_update_values(vec![(
                "'Schedule'!D2:E2".to_string(),
                vec![vec!["HOLD:PENDING".to_string(), "HOLD:PENDING".to_string()]],
            )])
            .await
            .unwrap();
        // Nothing to write means no request at all
        client.batch_update_values(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn add_sheet_posts_a_batch_update_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1:batchUpdate"))
            .and(body_partial_json(json!({
                "requests": [{ "addSheet": { "properties": { "title": "Bookings" } } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "replies": [{}] })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).add_sheet("Bookings", 1000, 10).await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        match client_for(&server).get_values("'Rooms'!A:D").await {
            Err(SheetsError::Api { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "PERMISSION_DENIED");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }
}
