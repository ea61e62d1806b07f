#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    use xiphos::config::IndexerConfig;
    use xiphos::context::AddOptions;
    use xiphos::document::Document;
    use xiphos::error::ErrorKind;
    use xiphos::index::{FullTextIndex, MemoryIndexRegistry};
    use xiphos::indexer::Indexer;
    use xiphos::schema::{FieldSpec, Schema};
    use xiphos::service::{Dispatch, IndexingService};
    use xiphos::store::{DocTable, DocumentStore};

    struct Fixture {
        service: IndexingService,
        schema: Arc<Schema>,
        store: Arc<DocTable>,
        registry: Arc<MemoryIndexRegistry>,
        fulltext: Arc<FullTextIndex>,
    }

    impl Fixture {
        fn key_of(&self, field: &str) -> String {
            self.schema.field_key(self.schema.resolve_field(field).unwrap())
        }
    }

    fn fixture(offload_threshold: usize) -> Fixture {
        let schema = Arc::new(
            Schema::builder("products")
                .add_field(FieldSpec::text("title").sortable())
                .unwrap()
                .add_field(FieldSpec::text("body"))
                .unwrap()
                .add_field(FieldSpec::tag("color"))
                .unwrap()
                .add_field(FieldSpec::numeric("price").sortable())
                .unwrap()
                .add_field(FieldSpec::geo("loc"))
                .unwrap()
                .add_field(FieldSpec::numeric("hits").no_index())
                .unwrap()
                .store_byte_offsets()
                .build()
                .unwrap(),
        );

        let store = Arc::new(DocTable::new());
        let registry = Arc::new(MemoryIndexRegistry::new());
        let fulltext = Arc::new(FullTextIndex::new());
        let indexer = Indexer::new(store.clone(), registry.clone(), fulltext.clone());

        let config = IndexerConfig {
            offload_threshold,
            worker_threads: Some(2),
            ..IndexerConfig::default()
        };
        let service = IndexingService::with_indexer(schema.clone(), config, indexer).unwrap();

        Fixture {
            service,
            schema,
            store,
            registry,
            fulltext,
        }
    }

    fn index(fixture: &Fixture, doc: &Document, options: AddOptions) -> xiphos::context::IndexingOutcome {
        let completion = fixture.service.add_document(doc, options).unwrap();
        tokio_test::block_on(completion)
    }

    #[test]
    fn test_duplicate_field_fails_setup_without_mutation() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("title", "first")
            .add_text("Title", "second")
            .build();

        let err = fixture.service.add_document(&doc, AddOptions::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateField);
        assert!(fixture.store.is_empty());
        assert_eq!(fixture.fulltext.doc_count(), 0);
        assert_eq!(fixture.service.pool().stats().checked_out, 0);
    }

    #[test]
    fn test_text_fields_share_positions() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("title", "hello world")
            .add_text("body", "rust compiler")
            .build();

        let outcome = index(&fixture, &doc, AddOptions::empty());
        let doc_id = outcome.doc_id().unwrap();

        let positions: Vec<u32> = ["hello", "world", "rust", "compiler"]
            .iter()
            .map(|term| {
                let postings = fixture.fulltext.postings(term);
                assert_eq!(postings.len(), 1, "postings of {term}");
                assert_eq!(postings[0].doc_id, doc_id);
                postings[0].positions[0]
            })
            .collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);

        let offsets = fixture.fulltext.byte_offsets(doc_id).unwrap().unwrap();
        assert_eq!(offsets.fields().len(), 2);
        assert_eq!(offsets.fields()[1].first_tok_pos, 3);
        assert_eq!(offsets.fields()[1].last_tok_pos, 4);

        let md = fixture.store.metadata(doc_id).unwrap();
        assert_eq!(md.total_tokens, 4);
    }

    #[test]
    fn test_numeric_parse_error_aborts_document() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("color", "red,blue")
            .add_text("price", "abc")
            .add_text("loc", "-122.4,37.7")
            .build();

        let outcome = index(&fixture, &doc, AddOptions::empty());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ParseError));
        assert!(fixture.registry.tag(&fixture.key_of("color")).is_none());
        assert!(fixture.registry.geo(&fixture.key_of("loc")).is_none());
        assert!(fixture.store.is_empty());
    }

    #[test]
    fn test_geo_values() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1").add_text("loc", "-122.4,37.7").build();
        let doc_id = index(&fixture, &doc, AddOptions::empty()).doc_id().unwrap();

        let geo = fixture.registry.geo(&fixture.key_of("loc")).unwrap();
        let point = *geo.lock().get(doc_id).unwrap();
        assert_eq!(point.lon, -122.4);
        assert_eq!(point.lat, 37.7);

        let bad = Document::builder("doc:2").add_text("loc", "notanumber").build();
        let outcome = index(&fixture, &bad, AddOptions::empty());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::GeoFormatError));
        assert!(fixture.store.id_by_key("doc:2").is_none());
    }

    #[test]
    fn test_tags_and_numbers_are_committed() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("color", "Red, Blue")
            .add_text("price", "19.5")
            .build();
        let doc_id = index(&fixture, &doc, AddOptions::empty()).doc_id().unwrap();

        let tags = fixture.registry.tag(&fixture.key_of("color")).unwrap();
        assert_eq!(tags.lock().docs("red"), &[doc_id]);
        assert_eq!(tags.lock().docs("blue"), &[doc_id]);

        let prices = fixture.registry.numeric(&fixture.key_of("price")).unwrap();
        assert_eq!(prices.lock().range_search(Some(10.0), Some(20.0)), vec![doc_id]);

        let md = fixture.store.metadata(doc_id).unwrap();
        let sv = md.sort_vector.unwrap();
        let price_slot = fixture.schema.sorting_index("price").unwrap();
        assert_eq!(sv.get(price_slot).unwrap().as_num(), Some(19.5));
    }

    #[test]
    fn test_existing_key_requires_replace() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1").add_text("title", "first").build();
        assert_eq!(index(&fixture, &doc, AddOptions::empty()).doc_id(), Some(1));

        let again = index(&fixture, &doc, AddOptions::empty());
        assert_eq!(again.error_kind(), Some(ErrorKind::Generic));

        let replaced = index(&fixture, &doc, AddOptions::REPLACE);
        assert_eq!(replaced.doc_id(), Some(2));
        assert!(fixture.store.metadata(1).unwrap().deleted);
        assert_eq!(fixture.store.id_by_key("doc:1"), Some(2));
    }

    #[test]
    fn test_metadata_only_update() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("title", "widget")
            .add_text("price", "10")
            .build();
        let doc_id = index(&fixture, &doc, AddOptions::empty()).doc_id().unwrap();
        let prices = fixture.registry.numeric(&fixture.key_of("price")).unwrap();
        let entries = prices.lock().len();

        let update = Document::builder("doc:1")
            .add_text("hits", "42")
            .score(0.5)
            .payload(b"meta".to_vec())
            .build();
        let outcome = index(&fixture, &update, AddOptions::PARTIAL);
        assert_eq!(outcome.doc_id(), Some(doc_id));

        let md = fixture.store.metadata(doc_id).unwrap();
        assert_eq!(md.score, 0.5);
        assert_eq!(md.payload.as_deref(), Some(&b"meta"[..]));
        assert_eq!(prices.lock().len(), entries);
        assert_eq!(fixture.store.len(), 1);
    }

    #[test]
    fn test_replace_merge_keeps_stored_fields() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1")
            .add_text("title", "old")
            .add_text("price", "10")
            .build();
        index(&fixture, &doc, AddOptions::empty());

        let update = Document::builder("doc:1").add_text("title", "new").build();
        let outcome = index(&fixture, &update, AddOptions::PARTIAL);
        let doc_id = outcome.doc_id().unwrap();
        assert_eq!(doc_id, 2);

        assert_eq!(fixture.fulltext.docs("new"), vec![doc_id]);
        let prices = fixture.registry.numeric(&fixture.key_of("price")).unwrap();
        assert!(prices.lock().range_search(Some(10.0), Some(10.0)).contains(&doc_id));
    }

    #[test]
    fn test_replace_merge_of_missing_document() {
        let fixture = fixture(1024);
        let update = Document::builder("ghost").add_text("title", "boo").build();

        let outcome = index(&fixture, &update, AddOptions::PARTIAL);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::NoDocument));
        assert!(fixture.store.is_empty());
        assert!(fixture.registry.is_empty());
        assert_eq!(fixture.fulltext.doc_count(), 0);
    }

    #[test]
    fn test_inline_completion_runs_before_submit_returns() {
        let fixture = fixture(1024);
        let doc = Document::builder("doc:1").add_text("body", "tiny").build();
        let ctx = fixture.service.new_context(&doc, AddOptions::empty()).unwrap();

        let (tx, rx) = mpsc::channel();
        let caller = thread::current().id();
        let dispatch = fixture.service.submit(
            ctx,
            Box::new(move |outcome| {
                tx.send((outcome.is_ok(), thread::current().id())).unwrap();
            }),
        );

        assert_eq!(dispatch, Dispatch::Inline);
        let (ok, thread_id) = rx.try_recv().unwrap();
        assert!(ok);
        assert_eq!(thread_id, caller);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_offloaded_completion_runs_once() {
        let fixture = fixture(64);
        let body = "lorem ipsum dolor sit amet ".repeat(8);
        let doc = Document::builder("doc:1")
            .add_text("body", &body)
            .add_text("price", "3")
            .build();

        let completion = fixture.service.add_document(&doc, AddOptions::empty()).unwrap();
        assert_eq!(completion.dispatch(), Dispatch::Offloaded);
        let outcome = tokio_test::block_on(completion);
        assert_eq!(outcome.doc_id(), Some(1));
        assert_eq!(fixture.fulltext.docs("lorem"), vec![1]);
        assert_eq!(fixture.service.pool().stats().checked_out, 0);
    }

    #[test]
    fn test_temporary_index_never_offloads() {
        let schema = Schema::builder("scratch")
            .add_field(FieldSpec::text("body"))
            .unwrap()
            .temporary()
            .build()
            .unwrap();
        let config = IndexerConfig {
            offload_threshold: 1,
            worker_threads: Some(1),
            ..IndexerConfig::default()
        };
        let service = IndexingService::new(Arc::new(schema), config).unwrap();

        let doc = Document::builder("doc:1").add_text("body", "some words").build();
        let completion = service.add_document(&doc, AddOptions::empty()).unwrap();
        assert_eq!(completion.dispatch(), Dispatch::Inline);
        assert!(tokio_test::block_on(completion).is_ok());
    }

    #[test]
    fn test_add_batch() {
        let fixture = fixture(16);
        let docs: Vec<Document> = (0..20)
            .map(|i| {
                Document::builder(format!("doc:{i}"))
                    .add_text("body", format!("document number {i} in a batch"))
                    .add_text("color", if i % 2 == 0 { "even" } else { "odd" })
                    .add_text("price", if i == 7 { "seven".to_string() } else { i.to_string() })
                    .build()
            })
            .collect();

        let outcomes = fixture.service.add_batch(&docs, AddOptions::empty());
        assert_eq!(outcomes.len(), 20);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.key, format!("doc:{i}"));
            if i == 7 {
                assert_eq!(outcome.error_kind(), Some(ErrorKind::ParseError));
            } else {
                assert!(outcome.is_ok(), "{i}: {:?}", outcome.result);
            }
        }

        assert_eq!(fixture.store.len(), 19);
        let tags = fixture.registry.tag(&fixture.key_of("color")).unwrap();
        assert_eq!(tags.lock().docs("even").len(), 10);
        assert_eq!(tags.lock().docs("odd").len(), 9);
        assert_eq!(fixture.service.pool().stats().checked_out, 0);
    }
}
