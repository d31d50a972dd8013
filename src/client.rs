use std::fmt;
use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::{
    completion::{self, Callback, Completion},
    config::{ClientConfig, StatusPolicy},
    metrics::{self, Operation, RequestTimer},
    models::{DataPoint, QueryOptions, WriteBatch},
    window::{resolve_window, Clock, SystemClock},
    MetricsError, Result,
};

/// Resolved second argument of [`MetricsClient::get`].
///
/// Converts from `()`, `QueryOptions` or `Option<QueryOptions>`; use
/// [`GetArgs::callback`] or [`GetArgs::with`] to attach a callback.
pub struct GetArgs {
    options: QueryOptions,
    callback: Option<Callback<Vec<DataPoint>>>,
}

impl GetArgs {
    /// Callback only; the default window applies.
    pub fn callback<F>(callback: F) -> Self
    where
        F: FnOnce(Result<Vec<DataPoint>>) + Send + 'static,
    {
        Self {
            options: QueryOptions::default(),
            callback: Some(Box::new(callback)),
        }
    }

    pub fn with<F>(options: QueryOptions, callback: F) -> Self
    where
        F: FnOnce(Result<Vec<DataPoint>>) + Send + 'static,
    {
        Self {
            options,
            callback: Some(Box::new(callback)),
        }
    }
}

impl From<()> for GetArgs {
    fn from(_: ()) -> Self {
        Self {
            options: QueryOptions::default(),
            callback: None,
        }
    }
}

impl From<QueryOptions> for GetArgs {
    fn from(options: QueryOptions) -> Self {
        Self {
            options,
            callback: None,
        }
    }
}

impl From<Option<QueryOptions>> for GetArgs {
    fn from(options: Option<QueryOptions>) -> Self {
        Self::from(options.unwrap_or_default())
    }
}

/// Client for the RHQ Metrics REST API.
///
/// Cloning is cheap; clones share configuration and the connection pool.
#[derive(Clone)]
pub struct MetricsClient {
    config: Arc<ClientConfig>,
    http: Client,
    clock: Arc<dyn Clock>,
}

impl MetricsClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Uses `clock` for the default read window instead of the system time.
    pub fn with_clock(config: ClientConfig, clock: impl Clock + 'static) -> Self {
        Self {
            config: Arc::new(config),
            http: Client::new(),
            clock: Arc::new(clock),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches the series `id`.
    ///
    /// Returns `InvalidArgument` right away for an empty id. Otherwise the
    /// request is spawned on the current tokio runtime and the outcome
    /// arrives through the returned [`Completion`] and the callback in
    /// `args`, if any.
    ///
    /// ```no_run
    /// # use rhq_metrics_client::{MetricsClient, QueryOptions, GetArgs};
    /// # async fn run() -> rhq_metrics_client::Result<()> {
    /// let client = MetricsClient::default();
    /// let points = client.get("cpu1", ())?.await?;
    /// let hourly = client.get("cpu1", QueryOptions::new().buckets(8))?.await?;
    /// let _pending = client.get("cpu1", GetArgs::callback(|res| println!("{:?}", res)))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, id: &str, args: impl Into<GetArgs>) -> Result<Completion<Vec<DataPoint>>> {
        if id.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "id must be a non-empty string".to_string(),
            ));
        }
        let GetArgs { options, callback } = args.into();

        let url = self.read_url(id, &options)?;
        let runtime = Handle::try_current().map_err(|_| MetricsError::NoRuntime)?;
        let (settler, completion) = completion::channel(callback);
        let http = self.http.clone();
        let policy = self.config.status_policy;

        debug!("Fetching {} from {}", id, url);
        runtime.spawn(async move {
            let timer = RequestTimer::new(Operation::Get);
            let target = url.to_string();
            let outcome = fetch_points(&http, url, policy).await;
            drop(timer);
            log_outcome(Operation::Get, &target, &outcome);
            settler.settle(outcome);
        });

        Ok(completion)
    }

    /// Appends one or more points. A single point is sent as a one-element
    /// array.
    pub fn post(&self, data: impl Into<WriteBatch>) -> Result<Completion<()>> {
        self.submit(data.into(), None)
    }

    pub fn post_with_callback<F>(
        &self,
        data: impl Into<WriteBatch>,
        callback: F,
    ) -> Result<Completion<()>>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.submit(data.into(), Some(Box::new(callback)))
    }

    fn submit(&self, batch: WriteBatch, callback: Option<Callback<()>>) -> Result<Completion<()>> {
        batch.validate()?;
        let body = serde_json::to_vec(&batch)
            .map_err(|e| MetricsError::Internal(format!("Failed to serialize points: {}", e)))?;

        let url = self.write_url()?;
        let runtime = Handle::try_current().map_err(|_| MetricsError::NoRuntime)?;
        let (settler, completion) = completion::channel(callback);
        let http = self.http.clone();
        let policy = self.config.status_policy;

        debug!("Posting {} points to {}", batch.len(), url);
        runtime.spawn(async move {
            let timer = RequestTimer::new(Operation::Post);
            let target = url.to_string();
            let outcome = store_points(&http, url, body, policy).await;
            drop(timer);
            log_outcome(Operation::Post, &target, &outcome);
            settler.settle(outcome);
        });

        Ok(completion)
    }

    /// `{base}/{id}?start=..&end=..[&buckets=..]`, with the window filled
    /// in from the client's clock.
    pub fn read_url(&self, id: &str, options: &QueryOptions) -> Result<Url> {
        let window = resolve_window(options, self.clock.now_millis());

        let mut url = self.write_url()?;
        url.path_segments_mut()
            .map_err(|_| MetricsError::Configuration("base URL cannot carry a path".to_string()))?
            .push(id);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("start", &window.start.to_string());
            query.append_pair("end", &window.end.to_string());
            if let Some(buckets) = options.buckets {
                query.append_pair("buckets", &buckets.to_string());
            }
        }

        Ok(url)
    }

    pub fn write_url(&self) -> Result<Url> {
        let base = self.config.base_url();
        let mut url = Url::parse(&base)
            .map_err(|e| MetricsError::Configuration(format!("invalid base URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| MetricsError::Configuration("base URL cannot carry a path".to_string()))?
            .clear()
            .extend(self.config.path_segments());
        Ok(url)
    }
}

impl Default for MetricsClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl From<ClientConfig> for MetricsClient {
    fn from(config: ClientConfig) -> Self {
        Self::new(config)
    }
}

impl fmt::Debug for MetricsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn fetch_points(http: &Client, url: Url, policy: StatusPolicy) -> Result<Vec<DataPoint>> {
    let response = http.get(url).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    check_status(status, &body, policy)?;

    Ok(serde_json::from_slice(&body)?)
}

async fn store_points(http: &Client, url: Url, body: Vec<u8>, policy: StatusPolicy) -> Result<()> {
    let response = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;
    let status = response.status();
    let body = response.bytes().await?;

    check_status(status, &body, policy)
}

fn check_status(status: StatusCode, body: &[u8], policy: StatusPolicy) -> Result<()> {
    if policy == StatusPolicy::Lenient || status.is_success() {
        return Ok(());
    }
    Err(MetricsError::UnexpectedStatus {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn log_outcome<T>(operation: Operation, target: &str, outcome: &Result<T>) {
    match outcome {
        Ok(_) => info!("{} {} completed", operation.as_str(), target),
        Err(e) => {
            metrics::record_failure(operation);
            error!("{} {} failed: {}", operation.as_str(), target, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::FixedClock;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_700_000_000_000;
    const EIGHT_HOURS_MS: i64 = 8 * 60 * 60 * 1000;

    fn client() -> MetricsClient {
        MetricsClient::with_clock(ClientConfig::default(), FixedClock(NOW))
    }

    #[test]
    fn test_construction_styles_agree() {
        let config = ClientConfig::new()
            .with_host("example.com")
            .with_port(80)
            .with_base_path("/foobar");
        let explicit = MetricsClient::new(config.clone());
        let converted = MetricsClient::from(config.clone());

        assert_eq!(explicit.config(), &config);
        assert_eq!(converted.config(), &config);
        assert_eq!(MetricsClient::default().config(), &ClientConfig::default());
    }

    #[test]
    fn test_read_url_defaults_window() {
        let url = client().read_url("cpu1", &QueryOptions::default()).unwrap();
        assert_eq!(url.path(), "/rhq-metrics/metrics/cpu1");
        assert_eq!(
            url.query(),
            Some(format!("start={}&end={}", NOW - EIGHT_HOURS_MS, NOW).as_str())
        );
    }

    #[test]
    fn test_read_url_buckets_only_when_given() {
        let opts = QueryOptions::new().start(100).end(200);
        let plain = client().read_url("cpu1", &opts).unwrap();
        assert_eq!(plain.query(), Some("start=100&end=200"));

        let bucketed = client().read_url("cpu1", &opts.buckets(60)).unwrap();
        assert_eq!(bucketed.query(), Some("start=100&end=200&buckets=60"));
    }

    #[test]
    fn test_read_url_encodes_id_as_one_segment() {
        let url = client().read_url("host/cpu 1", &QueryOptions::default()).unwrap();
        assert_eq!(url.path(), "/rhq-metrics/metrics/host%2Fcpu%201");
    }

    #[test]
    fn test_write_url_uses_host_and_port() {
        let client = MetricsClient::new(
            ClientConfig::new().with_host("example.com").with_port(80).with_base_path("/foobar/"),
        );
        assert_eq!(client.write_url().unwrap().as_str(), "http://example.com/foobar");
    }

    #[test]
    fn test_ipv6_host_builds_urls() {
        let client = MetricsClient::with_clock(
            ClientConfig::new().with_host("::1"),
            FixedClock(NOW),
        );
        assert_eq!(
            client.write_url().unwrap().as_str(),
            "http://[::1]:8080/rhq-metrics/metrics"
        );

        let url = client.read_url("cpu1", &QueryOptions::new().start(1).end(2)).unwrap();
        assert_eq!(url.as_str(), "http://[::1]:8080/rhq-metrics/metrics/cpu1?start=1&end=2");
    }

    #[test]
    fn test_bad_host_is_configuration_error() {
        let client = MetricsClient::new(ClientConfig::new().with_host("bad host"));
        assert!(matches!(client.write_url(), Err(MetricsError::Configuration(_))));
    }

    #[test]
    fn test_empty_id_rejected_before_io() {
        let err = client().get("", ()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_empty_batch_rejected_before_io() {
        let err = client().post(Vec::<DataPoint>::new()).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = client()
            .post_with_callback(DataPoint::new("", 1.0, 1), |_| panic!("must not settle"))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_requires_runtime() {
        let err = client().get("cpu1", ()).unwrap_err();
        assert!(matches!(err, MetricsError::NoRuntime));

        let err = client().post(DataPoint::new("cpu1", 1.0, 1)).unwrap_err();
        assert!(matches!(err, MetricsError::NoRuntime));
    }

    #[test]
    fn test_check_status_policy() {
        assert!(check_status(StatusCode::CREATED, b"", StatusPolicy::RequireSuccess).is_ok());
        assert!(check_status(StatusCode::NOT_FOUND, b"", StatusPolicy::Lenient).is_ok());

        let err = check_status(StatusCode::NOT_FOUND, b"missing", StatusPolicy::RequireSuccess)
            .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::UnexpectedStatus { status: 404, ref body } if body == "missing"
        ));
    }
}
