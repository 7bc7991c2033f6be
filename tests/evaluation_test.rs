#[cfg(test)]
mod evaluation_tests {
    use std::{
        collections::BTreeMap,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use oas_evaluator::{
        error::{Error, Result, evaluation_error::EvaluationError},
        evaluation::{
            Evaluation, EvaluationOrchestrator, EvaluationOverview, EvaluationService, EvaluationStatus,
            EvaluationStore, InMemoryEvaluationStore,
        },
        executor::{HttpTransport, RequestExecutor, TransportError, TransportResponse},
        shared::EvaluatorConfig,
        spec::{HttpMethod, INLINE_SOURCE, SpecLoader, SpecSource, Specification},
        synth::{DataSynthesizer, RequestPlan},
    };
    use serde_json::{Value, json};

    /// GET succeeds, POST answers 500.
    struct MethodTransport;

    #[async_trait]
    impl HttpTransport for MethodTransport {
        async fn send(
            &self,
            plan: &RequestPlan,
            _timeout: Duration,
        ) -> std::result::Result<TransportResponse, TransportError> {
            let (status, status_text, body) = match plan.method {
                HttpMethod::Get => (200, "OK", json!({"id": 1})),
                HttpMethod::Post => (500, "Internal Server Error", Value::Null),
            };
            Ok(TransportResponse {
                status,
                status_text: status_text.to_string(),
                headers: BTreeMap::new(),
                body,
            })
        }
    }

    /// Records `(status, processed, logs)` for every update.
    #[derive(Default)]
    struct SnapshotStore {
        inner: InMemoryEvaluationStore,
        snapshots: Mutex<Vec<(EvaluationStatus, usize, usize)>>,
    }

    /// Fails the n-th update (1-based), passes everything else through.
    struct FlakyStore {
        inner: InMemoryEvaluationStore,
        fail_on: usize,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl EvaluationStore for SnapshotStore {
        async fn create(&self, evaluation: Evaluation) -> Result<()> {
            self.inner.create(evaluation).await
        }

        async fn get(&self, id: &str) -> Result<Option<Evaluation>> {
            self.inner.get(id).await
        }

        async fn list(&self, skip: usize, limit: usize) -> Result<Vec<EvaluationOverview>> {
            self.inner.list(skip, limit).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        async fn update(&self, evaluation: &Evaluation) -> Result<()> {
            self.snapshots.lock().unwrap().push((
                evaluation.status,
                evaluation.processed(),
                evaluation.request_logs.len(),
            ));
            self.inner.update(evaluation).await
        }

        async fn delete(&self, id: &str) -> Result<Option<Evaluation>> {
            self.inner.delete(id).await
        }
    }

    #[async_trait]
    impl EvaluationStore for FlakyStore {
        async fn create(&self, evaluation: Evaluation) -> Result<()> {
            self.inner.create(evaluation).await
        }

        async fn get(&self, id: &str) -> Result<Option<Evaluation>> {
            self.inner.get(id).await
        }

        async fn list(&self, skip: usize, limit: usize) -> Result<Vec<EvaluationOverview>> {
            self.inner.list(skip, limit).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        async fn update(&self, evaluation: &Evaluation) -> Result<()> {
            let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(Error::EvaluationError(EvaluationError::Storage("write rejected".to_string())));
            }
            self.inner.update(evaluation).await
        }

        async fn delete(&self, id: &str) -> Result<Option<Evaluation>> {
            self.inner.delete(id).await
        }
    }

    fn petstore(base_url: Option<&str>) -> Value {
        let mut document = json!({
            "openapi": "3.0.2",
            "info": {"title": "Swagger Petstore", "version": "1.0.17"},
            "paths": {
                "/pet": {
                    "get": {},
                    "put": {},
                    "post": {
                        "requestBody": {
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}
                        }
                    }
                },
                "/pet/{petId}": {
                    "get": {
                        "parameters": [
                            {"name": "petId", "in": "path", "required": true, "schema": {"type": "integer"}}
                        ]
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string"}}
                    }
                }
            }
        });
        if let Some(url) = base_url {
            document["servers"] = json!([{"url": url}]);
        }
        document
    }

    fn config() -> EvaluatorConfig {
        EvaluatorConfig::default().with_retry_delay(Duration::from_millis(1))
    }

    fn executor() -> Arc<RequestExecutor> {
        Arc::new(RequestExecutor::with_transport(&config(), Arc::new(MethodTransport)))
    }

    fn service(store: Arc<dyn EvaluationStore>) -> EvaluationService {
        EvaluationService::with_executor(store, executor(), config())
    }

    async fn prepared(store: &Arc<dyn EvaluationStore>, document: Value) -> (String, Arc<Specification>) {
        let spec = SpecLoader::new().load(SpecSource::Document(document)).await.unwrap();
        let evaluation = Evaluation::new(spec.source.clone(), spec.document.clone(), spec.endpoints().len());
        let id = evaluation.id.clone();
        store.create(evaluation).await.unwrap();
        (id, Arc::new(spec))
    }

    async fn run(store: Arc<dyn EvaluationStore>, id: &str, spec: Arc<Specification>) -> EvaluationStatus {
        let endpoints = spec.endpoints();
        EvaluationOrchestrator::new(store, executor(), DataSynthesizer::seeded(&config(), 7))
            .run(id.to_string(), spec, endpoints)
            .await
    }

    #[tokio::test]
    async fn test_full_run_completes() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let service = service(store.clone());

        let created = service
            .create(SpecSource::Document(petstore(Some("http://petstore.test/api/v3"))))
            .await
            .unwrap();
        assert_eq!(created.status, EvaluationStatus::Pending);
        assert_eq!(created.total_endpoints, 3);
        assert_eq!(created.message, "Evaluation started");

        let evaluation = service
            .wait_for_terminal(&created.id, Duration::from_millis(5), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(evaluation.status, EvaluationStatus::Completed);
        assert_eq!(evaluation.spec_url, INLINE_SOURCE);
        assert_eq!(evaluation.successful_requests, 2);
        assert_eq!(evaluation.failed_requests, 1);
        assert_eq!(
            evaluation.successful_requests + evaluation.failed_requests,
            evaluation.total_endpoints
        );
        assert!((evaluation.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!(evaluation.completed_at.is_some());

        let keys: Vec<String> = evaluation.request_logs.iter().map(|log| log.endpoint_key()).collect();
        assert_eq!(keys, vec!["GET /pet", "POST /pet", "GET /pet/{petId}"]);

        let summary = evaluation.summary.unwrap();
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.status_code_distribution["200"], 2);
        assert_eq!(summary.error_types["HTTP 500: Internal Server Error"], 1);
    }

    #[tokio::test]
    async fn test_snapshots_are_consistent_prefixes() {
        let recorder = Arc::new(SnapshotStore::default());
        let store: Arc<dyn EvaluationStore> = recorder.clone();
        let (id, spec) = prepared(&store, petstore(Some("http://petstore.test"))).await;

        let status = run(store.clone(), &id, spec).await;
        assert_eq!(status, EvaluationStatus::Completed);

        let snapshots = recorder.snapshots.lock().unwrap().clone();
        assert_eq!(
            snapshots,
            vec![
                (EvaluationStatus::Running, 0, 0),
                (EvaluationStatus::Running, 1, 1),
                (EvaluationStatus::Running, 2, 2),
                (EvaluationStatus::Running, 3, 3),
                (EvaluationStatus::Completed, 3, 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_unsendable_requests_become_failed_outcomes() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        // no servers: every URL is relative
        let (id, spec) = prepared(&store, petstore(None)).await;

        let status = run(store.clone(), &id, spec).await;
        assert_eq!(status, EvaluationStatus::Completed);

        let evaluation = store.get(&id).await.unwrap().unwrap();
        assert_eq!(evaluation.failed_requests, 3);
        assert_eq!(evaluation.success_rate, 0.0);
        for log in &evaluation.request_logs {
            assert!(!log.success);
            assert!(log.error.as_ref().unwrap().contains("invalid request"));
        }
    }

    #[tokio::test]
    async fn test_store_failure_marks_run_failed() {
        let store: Arc<dyn EvaluationStore> = Arc::new(FlakyStore {
            inner: InMemoryEvaluationStore::new(),
            fail_on: 3,
            updates: AtomicUsize::new(0),
        });
        let (id, spec) = prepared(&store, petstore(Some("http://petstore.test"))).await;

        let status = run(store.clone(), &id, spec).await;
        assert_eq!(status, EvaluationStatus::Failed);

        let evaluation = store.get(&id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Failed);
        assert_eq!(evaluation.request_logs.len(), 1);
        assert_eq!(evaluation.successful_requests, 1);
        assert!(evaluation.completed_at.is_some());
        assert!(evaluation.summary.is_none());
    }

    #[tokio::test]
    async fn test_failed_start_still_ends_failed() {
        let store: Arc<dyn EvaluationStore> = Arc::new(FlakyStore {
            inner: InMemoryEvaluationStore::new(),
            fail_on: 1,
            updates: AtomicUsize::new(0),
        });
        let (id, spec) = prepared(&store, petstore(Some("http://petstore.test"))).await;

        assert_eq!(run(store.clone(), &id, spec).await, EvaluationStatus::Failed);
        let evaluation = store.get(&id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Failed);
        assert!(evaluation.request_logs.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_spec_persists_nothing() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let service = service(store.clone());

        let result = service
            .create(SpecSource::Document(json!({"openapi": "3.0.0", "paths": {}})))
            .await;

        assert!(matches!(
            result,
            Err(Error::EvaluationError(EvaluationError::SpecParse(_)))
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pagination() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let mut ids = Vec::new();
        for i in 0..15 {
            let evaluation = Evaluation::new(format!("spec-{i}.json"), json!({}), 0);
            ids.push(evaluation.id.clone());
            store.create(evaluation).await.unwrap();
        }
        let service = service(store);

        let page = service.list(2, 10).await.unwrap();
        assert_eq!(page.evaluations.len(), 5);
        assert_eq!(page.pagination.current, 2);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(page.pagination.total, 15);
        // newest first: page 2 holds the five oldest
        assert_eq!(page.evaluations[4].id, ids[0]);

        let first = service.list(0, 0).await.unwrap();
        assert_eq!(first.pagination.current, 1);
        assert_eq!(first.evaluations.len(), 10);
        assert_eq!(first.evaluations[0].id, ids[14]);
        assert_eq!(first.evaluations[0].spec_url, "spec-14.json");
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let evaluation = Evaluation::new("petstore.json", json!({}), 0);
        let id = evaluation.id.clone();
        store.create(evaluation).await.unwrap();
        let service = service(store.clone());

        assert_eq!(service.get(&id).await.unwrap().spec_url, "petstore.json");

        let missing = service.delete("does-not-exist").await;
        assert!(matches!(
            missing,
            Err(Error::EvaluationError(EvaluationError::EvaluationNotFound(_)))
        ));
        assert_eq!(store.count().await.unwrap(), 1);

        assert_eq!(service.delete(&id).await.unwrap().id, id);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(matches!(
            service.get(&id).await,
            Err(Error::EvaluationError(EvaluationError::EvaluationNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let store = InMemoryEvaluationStore::new();
        let evaluation = Evaluation::new("petstore.json", json!({}), 0);
        store.create(evaluation.clone()).await.unwrap();

        assert!(matches!(
            store.create(evaluation).await,
            Err(Error::EvaluationError(EvaluationError::Storage(_)))
        ));
    }

    #[tokio::test]
    async fn test_wait_for_terminal_times_out() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let evaluation = Evaluation::new("petstore.json", json!({}), 1);
        let id = evaluation.id.clone();
        store.create(evaluation).await.unwrap();

        let result = service(store)
            .wait_for_terminal(&id, Duration::from_millis(5), Duration::from_millis(30))
            .await;
        assert!(matches!(
            result,
            Err(Error::EvaluationError(EvaluationError::Orchestration(_)))
        ));
    }

    /// Panics on every call.
    struct PanickingTransport;

    #[async_trait]
    impl HttpTransport for PanickingTransport {
        async fn send(
            &self,
            _plan: &RequestPlan,
            _timeout: Duration,
        ) -> std::result::Result<TransportResponse, TransportError> {
            panic!("transport exploded")
        }
    }

    #[tokio::test]
    async fn test_full_double_range_parameter_completes() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let service = service(store);

        let created = service
            .create(SpecSource::Document(json!({
                "openapi": "3.0.1",
                "info": {"title": "Measurements", "version": "v1"},
                "servers": [{"url": "http://measure.test"}],
                "paths": {
                    "/measure": {
                        "get": {
                            "parameters": [{
                                "name": "value",
                                "in": "query",
                                "schema": {
                                    "type": "number",
                                    "format": "double",
                                    "minimum": -1.7976931348623157e308,
                                    "maximum": 1.7976931348623157e308
                                }
                            }]
                        }
                    }
                }
            })))
            .await
            .unwrap();

        let evaluation = service
            .wait_for_terminal(&created.id, Duration::from_millis(5), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Completed);
        assert_eq!(evaluation.successful_requests, 1);
    }

    #[tokio::test]
    async fn test_panicking_run_ends_failed() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let (id, spec) = prepared(&store, petstore(Some("http://petstore.test"))).await;
        let executor = Arc::new(RequestExecutor::with_transport(&config(), Arc::new(PanickingTransport)));
        let endpoints = spec.endpoints();

        let status = EvaluationOrchestrator::new(store.clone(), executor, DataSynthesizer::seeded(&config(), 7))
            .run(id.clone(), spec, endpoints)
            .await;
        assert_eq!(status, EvaluationStatus::Failed);

        let evaluation = store.get(&id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Failed);
        assert!(evaluation.completed_at.is_some());
        assert!(evaluation.request_logs.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_background_run_is_observable() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        let executor = Arc::new(RequestExecutor::with_transport(&config(), Arc::new(PanickingTransport)));
        let service = EvaluationService::with_executor(store, executor, config());

        let created = service
            .create(SpecSource::Document(petstore(Some("http://petstore.test"))))
            .await
            .unwrap();

        let evaluation = service
            .wait_for_terminal(&created.id, Duration::from_millis(5), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Failed);
    }

    #[tokio::test]
    async fn test_huge_page_is_empty() {
        let store: Arc<dyn EvaluationStore> = Arc::new(InMemoryEvaluationStore::new());
        store.create(Evaluation::new("petstore.json", json!({}), 0)).await.unwrap();

        let page = service(store).list(usize::MAX / 2, 10).await.unwrap();
        assert!(page.evaluations.is_empty());
        assert_eq!(page.pagination.current, usize::MAX / 2);
        assert_eq!(page.pagination.pages, 1);
        assert_eq!(page.pagination.total, 1);
    }
}
