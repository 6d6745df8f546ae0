//! Per-tenant index lifecycle: writing, deleting and searching messages.
//!
//! Every tenant (chat group) owns one tantivy index under `{root}/{group_id}/`. Writers and
//! readers are opened per call and released before the call returns; nothing holds an index
//! open between operations. Writes to one tenant are serialized by a per-tenant lock, while
//! different tenants proceed in parallel.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chatdex_config::Config;
use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tantivy::{
    DocAddress, DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, SegmentReader,
    TantivyDocument,
    collector::{Collector, Count, TopDocs},
    directory::MmapDirectory,
    query::Query,
};
use tracing::{debug, error, info, warn};

use crate::{
    IndexError,
    builders::QueryContext,
    compile::{compile_simple, compile_syntax},
    document::{MessageDocument, from_tantivy, to_tantivy},
    registry::{ExtensionFieldRegistry, FieldNameSource},
    schema::IndexSchema,
    service::SearchMode,
    tokenizer::{CHAT_TOKENIZER, build_analyzer},
};

/// Smallest writer heap tantivy accepts for one indexing thread.
const MIN_WRITER_HEAP: usize = 15_000_000;

/// File tantivy writes once an index exists.
const META_FILE: &str = "meta.json";

/// Result order: newest message id first, then segment and document order.
///
/// The trailing positions make the order total, so messages sharing an id keep the same
/// relative order however large the requested window is.
type RankKey = (i64, Reverse<u32>, Reverse<DocId>);

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    /// Number of matching messages, independent of pagination.
    pub total: usize,
    /// Messages in the requested window, most recent first.
    pub messages: Vec<MessageDocument>,
}

/// Outcome of a batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Documents indexed.
    pub written: usize,
    /// Documents skipped for having no content.
    pub skipped: usize,
    /// Documents that could not be indexed.
    pub failed: usize,
}

impl BatchReport {
    /// Sums two reports.
    fn combine(self, other: Self) -> Self {
        Self {
            written: self.written + other.written,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }
}

/// A point-in-time view of one tenant index.
pub struct TenantReader {
    /// Tenant id.
    tenant: i64,
    /// Searcher over the committed segments.
    searcher: Searcher,
    /// Field handles.
    schema: IndexSchema,
}

impl TenantReader {
    /// Tenant id.
    pub fn tenant(&self) -> i64 {
        self.tenant
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// Runs a query and returns the total hit count plus the `limit` most recent matches.
    fn top_messages(
        &self,
        query: &dyn Query,
        limit: usize,
    ) -> Result<(usize, Vec<MessageDocument>), IndexError> {
        let live = usize::try_from(self.searcher.num_docs()).unwrap_or(usize::MAX);
        let limit = limit.min(live);
        if limit == 0 {
            let total = self
                .searcher
                .search(query, &Count)
                .map_err(|e| IndexError::search(&e))?;
            return Ok((total, Vec::new()));
        }

        let collector = (Count, self.newest_first(limit));
        let (total, hits) = self
            .searcher
            .search(query, &collector)
            .map_err(|e| IndexError::search(&e))?;

        let messages = hits
            .into_iter()
            .map(|(_, address)| self.message(address))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok((total, messages))
    }

    /// Collects the `limit` best hits by [`RankKey`].
    fn newest_first(
        &self,
        limit: usize,
    ) -> impl Collector<Fruit = Vec<(RankKey, DocAddress)>> {
        let ords: HashMap<_, u32> = self
            .searcher
            .segment_readers()
            .iter()
            .enumerate()
            .map(|(ord, segment)| (segment.segment_id(), u32::try_from(ord).unwrap_or(u32::MAX)))
            .collect();

        TopDocs::with_limit(limit).custom_score(move |segment: &SegmentReader| {
            let ord = ords.get(&segment.segment_id()).copied().unwrap_or(u32::MAX);
            let message_ids = segment.fast_fields().i64("message_id").ok();
            move |doc: DocId| {
                let message_id = message_ids
                    .as_ref()
                    .and_then(|column| column.first(doc))
                    .unwrap_or(i64::MIN);
                (message_id, Reverse(ord), Reverse(doc))
            }
        })
    }

    /// Loads and maps one stored document.
    fn message(&self, address: DocAddress) -> Result<Option<MessageDocument>, IndexError> {
        let doc: TantivyDocument = self
            .searcher
            .doc(address)
            .map_err(|e| IndexError::search(&e))?;
        Ok(from_tantivy(&self.schema, &doc))
    }
}

impl FieldNameSource for TenantReader {
    fn field_names(&self) -> Result<Vec<String>, IndexError> {
        let mut names = BTreeSet::new();
        for segment in self.searcher.segment_readers() {
            let inverted = segment
                .inverted_index(self.schema.extension_names)
                .map_err(|e| IndexError::Search(e.to_string()))?;
            let mut terms = inverted
                .terms()
                .stream()
                .map_err(|e| IndexError::Search(e.to_string()))?;
            while terms.advance() {
                names.insert(String::from_utf8_lossy(terms.key()).into_owned());
            }
        }
        Ok(names.into_iter().collect())
    }
}

/// Owns the tenant indexes under one root directory.
pub struct IndexManager {
    /// Directory holding one sub-directory per tenant.
    root: PathBuf,
    /// Memory budget for each writer.
    heap_bytes: usize,
    /// Field handles shared by every tenant.
    schema: IndexSchema,
    /// Extension field cache, invalidated after every commit.
    registry: Arc<ExtensionFieldRegistry>,
    /// One writer lock per tenant.
    writer_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl IndexManager {
    /// Creates a manager over `root`.
    ///
    /// Heaps below tantivy's per-thread minimum are raised to it.
    pub fn new(
        root: impl Into<PathBuf>,
        heap_bytes: usize,
        registry: Arc<ExtensionFieldRegistry>,
    ) -> Self {
        Self {
            root: root.into(),
            heap_bytes: heap_bytes.max(MIN_WRITER_HEAP),
            schema: IndexSchema::new(),
            registry,
            writer_locks: DashMap::new(),
        }
    }

    /// Creates a manager from configuration, with its own registry.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.index.root,
            config.index.writer_heap_bytes,
            Arc::new(ExtensionFieldRegistry::from_settings(&config.registry)),
        )
    }

    /// Directory holding the tenant indexes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The shared extension field cache.
    pub fn registry(&self) -> &ExtensionFieldRegistry {
        &self.registry
    }

    /// Directory of one tenant's index.
    pub fn tenant_path(&self, tenant: i64) -> PathBuf {
        self.root.join(tenant.to_string())
    }

    /// Returns true if the tenant has ever been written to. Opens nothing.
    pub fn index_exists(&self, tenant: i64) -> bool {
        self.tenant_path(tenant).join(META_FILE).is_file()
    }

    /// Lists every tenant with an index on disk, in ascending order.
    pub fn tenants(&self) -> Result<Vec<i64>, IndexError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tenants = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(tenant) = entry.file_name().to_str().and_then(|name| name.parse().ok())
            else {
                continue;
            };
            if self.index_exists(tenant) {
                tenants.push(tenant);
            }
        }
        tenants.sort_unstable();
        Ok(tenants)
    }

    /// Number of live documents in a tenant index, zero if it does not exist.
    pub fn document_count(&self, tenant: i64) -> u64 {
        self.open_reader(tenant)
            .map_or(0, |reader| reader.num_docs())
    }

    /// Opens a reader on a tenant index.
    ///
    /// Returns `None` if the tenant was never written to. Open failures are logged and also
    /// yield `None`.
    pub fn open_reader(&self, tenant: i64) -> Option<TenantReader> {
        if !self.index_exists(tenant) {
            debug!(group_id = tenant, "no index for tenant");
            return None;
        }

        let reader = self
            .open_index(tenant, false)
            .and_then(|index| Self::reader(&index, &self.tenant_path(tenant)));
        match reader {
            Ok(reader) => Some(TenantReader {
                tenant,
                searcher: reader.searcher(),
                schema: self.schema.clone(),
            }),
            Err(e) => {
                warn!(group_id = tenant, error = %e, "failed to open index reader");
                None
            }
        }
    }

    /// Indexes one message.
    ///
    /// Messages with empty content are indexed too. Nothing is deduplicated: writing the
    /// same message id twice leaves two documents unless the caller deletes first.
    pub fn write(&self, message: &MessageDocument) -> Result<(), IndexError> {
        let tenant = message.group_id;
        let doc = to_tantivy(&self.schema, message)?;
        self.with_writer(tenant, |writer| {
            writer.add_document(doc).map_err(|e| IndexError::write(&e))?;
            Ok(())
        })?;
        debug!(group_id = tenant, message_id = message.message_id, "indexed message");
        Ok(())
    }

    /// Indexes many messages.
    ///
    /// Messages are grouped by tenant. Tenants are written in parallel, each with one writer.
    /// Messages without content are skipped. A message that fails is logged and counted, and
    /// the rest of the batch continues.
    pub fn write_batch(&self, messages: &[MessageDocument]) -> BatchReport {
        let mut partitions: BTreeMap<i64, Vec<&MessageDocument>> = BTreeMap::new();
        for message in messages {
            partitions.entry(message.group_id).or_default().push(message);
        }

        let report = partitions
            .into_par_iter()
            .map(|(tenant, messages)| self.write_partition(tenant, &messages))
            .reduce(BatchReport::default, BatchReport::combine);
        info!(
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            "batch write finished"
        );
        report
    }

    /// Writes one tenant's share of a batch.
    fn write_partition(&self, tenant: i64, messages: &[&MessageDocument]) -> BatchReport {
        let (empty, messages): (Vec<&MessageDocument>, Vec<&MessageDocument>) = messages
            .iter()
            .copied()
            .partition(|message| message.content.trim().is_empty());
        for message in &empty {
            debug!(
                group_id = tenant,
                message_id = message.message_id,
                "skipping message without content"
            );
        }

        let mut report = BatchReport {
            skipped: empty.len(),
            ..BatchReport::default()
        };
        if messages.is_empty() {
            return report;
        }

        let result = self.with_writer(tenant, |writer| {
            let mut written = 0;
            let mut failed = 0;
            for message in &messages {
                let added = to_tantivy(&self.schema, message)
                    .and_then(|doc| writer.add_document(doc).map_err(|e| IndexError::write(&e)));
                match added {
                    Ok(_) => written += 1,
                    Err(e) => {
                        error!(
                            group_id = tenant,
                            message_id = message.message_id,
                            error = %e,
                            "failed to index message"
                        );
                        failed += 1;
                    }
                }
            }
            Ok((written, failed))
        });

        match result {
            Ok((written, failed)) => {
                report.written = written;
                report.failed = failed;
            }
            Err(e) => {
                error!(group_id = tenant, error = %e, "failed to write tenant batch");
                report.failed = messages.len();
            }
        }
        report
    }

    /// Removes a message. Missing messages and missing indexes are not errors.
    pub fn delete(&self, tenant: i64, message_id: i64) -> Result<(), IndexError> {
        if !self.index_exists(tenant) {
            debug!(group_id = tenant, message_id, "delete on missing index ignored");
            return Ok(());
        }
        self.with_writer(tenant, |writer| {
            writer.delete_term(self.schema.message_term(message_id));
            Ok(())
        })?;
        debug!(group_id = tenant, message_id, "deleted message");
        Ok(())
    }

    /// Simple-mode search within one tenant.
    ///
    /// A blank query matches every message of the tenant. The total counts all matches,
    /// whatever the page window.
    pub fn search(
        &self,
        query: &str,
        tenant: i64,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage, IndexError> {
        self.search_tenant(SearchMode::Simple, query, tenant, skip, take)
    }

    /// Syntax-mode search within one tenant.
    pub fn syntax_search(
        &self,
        query: &str,
        tenant: i64,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage, IndexError> {
        self.search_tenant(SearchMode::Syntax, query, tenant, skip, take)
    }

    /// Simple-mode search across every tenant.
    pub fn search_all(&self, query: &str, skip: usize, take: usize) -> Result<SearchPage, IndexError> {
        self.search_every_tenant(SearchMode::Simple, query, skip, take)
    }

    /// Syntax-mode search across every tenant.
    pub fn syntax_search_all(
        &self,
        query: &str,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage, IndexError> {
        self.search_every_tenant(SearchMode::Syntax, query, skip, take)
    }

    /// Searches one tenant and slices the requested page.
    fn search_tenant(
        &self,
        mode: SearchMode,
        query: &str,
        tenant: i64,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage, IndexError> {
        let Some(reader) = self.open_reader(tenant) else {
            return Ok(SearchPage::default());
        };
        let limit = if take == 0 { 0 } else { skip.saturating_add(take) };
        let (total, messages) = self.collect(&reader, mode, query, limit)?;
        Ok(SearchPage {
            total,
            messages: messages.into_iter().skip(skip).take(take).collect(),
        })
    }

    /// Searches every tenant, merges the hits and slices the requested page.
    ///
    /// A tenant that cannot be opened or searched is logged and left out.
    fn search_every_tenant(
        &self,
        mode: SearchMode,
        query: &str,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage, IndexError> {
        let limit = if take == 0 { 0 } else { skip.saturating_add(take) };
        let per_tenant: Vec<(usize, Vec<MessageDocument>)> = self
            .tenants()?
            .into_par_iter()
            .filter_map(|tenant| {
                let reader = self.open_reader(tenant)?;
                self.collect(&reader, mode, query, limit)
                    .inspect_err(|e| {
                        warn!(group_id = tenant, error = %e, "skipping tenant in search");
                    })
                    .ok()
            })
            .collect();

        let total = per_tenant.iter().map(|(total, _)| total).sum();
        let mut messages: Vec<MessageDocument> = per_tenant
            .into_iter()
            .flat_map(|(_, messages)| messages)
            .collect();
        messages.sort_by_key(|message| (Reverse(message.message_id), message.group_id));

        Ok(SearchPage {
            total,
            messages: messages.into_iter().skip(skip).take(take).collect(),
        })
    }

    /// Compiles the query for one tenant and collects its top `limit` hits.
    fn collect(
        &self,
        reader: &TenantReader,
        mode: SearchMode,
        query: &str,
        limit: usize,
    ) -> Result<(usize, Vec<MessageDocument>), IndexError> {
        let ctx = QueryContext::new(reader.tenant, &self.schema, &self.registry, reader);
        let compiled = match mode {
            SearchMode::Simple => compile_simple(query, &ctx),
            SearchMode::Syntax => compile_syntax(query, &ctx),
        };
        reader.top_messages(compiled.as_ref(), limit)
    }

    /// Runs `f` with an exclusive writer on a tenant index, then commits.
    ///
    /// The writer is released on every path. Uncommitted changes are discarded when `f` or
    /// the commit fails. After a successful commit the tenant's extension fields are
    /// invalidated.
    fn with_writer<T>(
        &self,
        tenant: i64,
        f: impl FnOnce(&mut IndexWriter) -> Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        let lock = self.writer_locks.entry(tenant).or_default().clone();
        let _guard = lock.lock();

        let path = self.tenant_path(tenant);
        let index = self.open_index(tenant, true)?;
        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, self.heap_bytes)
            .map_err(|e| IndexError::open_index(path, &e))?;

        let value = f(&mut writer)?;
        writer.commit().map_err(|e| IndexError::commit(&e))?;
        writer
            .wait_merging_threads()
            .map_err(|e| IndexError::commit(&e))?;

        self.registry.invalidate(Some(tenant));
        Ok(value)
    }

    /// Opens a tenant index, creating it when `create` is set.
    fn open_index(&self, tenant: i64, create: bool) -> Result<Index, IndexError> {
        let path = self.tenant_path(tenant);
        if create {
            fs::create_dir_all(&path)?;
        }

        let dir = MmapDirectory::open(&path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.clone(), &err)
        })?;
        let index = if create {
            Index::open_or_create(dir, self.schema.schema().clone())
        } else {
            Index::open(dir)
        }
        .map_err(|e| IndexError::open_index(path.clone(), &e))?;

        if create {
            info!(group_id = tenant, path = %path.display(), "opened index for writing");
        }
        index.tokenizers().register(CHAT_TOKENIZER, build_analyzer());
        Ok(index)
    }

    /// Builds a reader that sees the latest commit.
    fn reader(index: &Index, path: &Path) -> Result<IndexReader, IndexError> {
        index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;

    use super::*;
    use crate::document::MessageExtension;

    fn manager() -> (TempDir, IndexManager) {
        let temp = TempDir::new().unwrap();
        let manager = IndexManager::new(
            temp.path(),
            MIN_WRITER_HEAP,
            Arc::new(ExtensionFieldRegistry::default()),
        );
        (temp, manager)
    }

    fn message(group_id: i64, message_id: i64, content: &str) -> MessageDocument {
        MessageDocument {
            id: group_id * 1000 + message_id,
            group_id,
            message_id,
            from_user_id: 1,
            reply_to_user_id: 0,
            reply_to_message_id: 0,
            timestamp: "2024-05-01T08:30:00Z".into(),
            content: content.into(),
            extensions: Vec::new(),
        }
    }

    fn ids(page: &SearchPage) -> Vec<i64> {
        page.messages.iter().map(|m| m.message_id).collect()
    }

    #[test]
    fn write_search_delete_round_trip() {
        let (_temp, manager) = manager();
        manager.write(&message(100, 1, "这是一条测试消息")).unwrap();

        let page = manager.search("测试", 100, 0, 20).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.messages[0].content, "这是一条测试消息");

        manager.delete(100, 1).unwrap();
        assert_eq!(manager.search("测试", 100, 0, 20).unwrap().total, 0);
    }

    #[test]
    fn writing_a_message_twice_keeps_both_copies() {
        let (_temp, manager) = manager();
        manager.write(&message(1, 1, "alpha one")).unwrap();
        manager.write(&message(1, 1, "alpha two")).unwrap();

        assert_eq!(manager.document_count(1), 2);
        assert_eq!(manager.search("alpha", 1, 0, 10).unwrap().total, 2);

        manager.delete(1, 1).unwrap();
        assert_eq!(manager.document_count(1), 0);
    }

    #[test]
    fn pages_over_duplicate_ids_cover_each_copy_once() {
        let (_temp, manager) = manager();
        for text in ["dup a", "dup b", "dup c"] {
            manager.write(&message(6, 1, text)).unwrap();
        }
        manager.write_batch(&[message(6, 1, "dup d"), message(6, 2, "dup e")]);

        let all = manager.search("dup", 6, 0, 10).unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.messages[0].content, "dup e");

        for take in 1..=3 {
            let mut contents = Vec::new();
            for skip in (0..5).step_by(take) {
                let page = manager.search("dup", 6, skip, take).unwrap();
                contents.extend(page.messages.into_iter().map(|m| m.content));
            }
            let expected: Vec<String> = all.messages.iter().map(|m| m.content.clone()).collect();
            assert_eq!(contents, expected, "take {take}");
        }
    }

    #[test]
    fn syntax_and_requires_both_terms() {
        let (_temp, manager) = manager();
        manager.write_batch(&[
            message(300, 1, "Lucene search engine"),
            message(300, 2, "Lucene indexing"),
            message(300, 3, "Search functionality"),
        ]);

        let page = manager.syntax_search("Lucene AND search", 300, 0, 20).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(ids(&page), vec![1]);

        let page = manager.syntax_search("lucene OR functionality", 300, 0, 20).unwrap();
        assert_eq!(page.total, 3);
    }

    #[test]
    fn syntax_not_and_phrase() {
        let (_temp, manager) = manager();
        manager.write_batch(&[
            message(5, 1, "search engine basics"),
            message(5, 2, "engine search order"),
            message(5, 3, "cooking recipes"),
        ]);

        let page = manager.syntax_search("\"search engine\"", 5, 0, 20).unwrap();
        assert_eq!(ids(&page), vec![1]);

        let page = manager.syntax_search("NOT cooking", 5, 0, 20).unwrap();
        assert_eq!(ids(&page), vec![2, 1]);

        let page = manager.syntax_search("engine -basics", 5, 0, 20).unwrap();
        assert_eq!(ids(&page), vec![2]);
    }

    #[test]
    fn malformed_syntax_still_searches() {
        let (_temp, manager) = manager();
        manager.write(&message(9, 1, "lucene in action")).unwrap();
        let page = manager.syntax_search("(lucene", 9, 0, 20).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn results_are_newest_first_and_pages_do_not_overlap() {
        let (_temp, manager) = manager();
        let batch: Vec<_> = (1..=7).map(|i| message(2, i, "hello world")).collect();
        let report = manager.write_batch(&batch);
        assert_eq!(report.written, 7);

        let first = manager.search("hello", 2, 0, 3).unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(ids(&first), vec![7, 6, 5]);

        let mut seen = HashSet::new();
        for skip in (0..7).step_by(3) {
            for id in ids(&manager.search("hello", 2, skip, 3).unwrap()) {
                assert!(seen.insert(id), "duplicate {id}");
            }
        }
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn take_zero_and_skip_past_end_keep_total() {
        let (_temp, manager) = manager();
        manager.write_batch(&[message(3, 1, "alpha"), message(3, 2, "alpha beta")]);

        let counted = manager.search("alpha", 3, 0, 0).unwrap();
        assert_eq!(counted.total, 2);
        assert!(counted.messages.is_empty());

        let beyond = manager.search("alpha", 3, 10, 5).unwrap();
        assert_eq!(beyond.total, 2);
        assert!(beyond.messages.is_empty());

        let huge = manager.search("alpha", 3, usize::MAX, usize::MAX).unwrap();
        assert_eq!(huge.total, 2);
    }

    #[test]
    fn blank_query_matches_every_document() {
        let (_temp, manager) = manager();
        manager.write_batch(&[
            message(4, 1, "one"),
            message(4, 2, "two"),
            message(4, 3, "three"),
        ]);

        let page = manager.search("  ", 4, 0, 10).unwrap();
        assert_eq!(page.total as u64, manager.document_count(4));
        assert_eq!(manager.search("！？", 4, 0, 10).unwrap().total, 0);
    }

    #[test]
    fn extension_fields_are_searchable() {
        let (_temp, manager) = manager();
        let mut msg = message(6, 1, "看看这张图");
        msg.extensions = vec![MessageExtension::new("OCR_Result", "发票 金额 invoice")];
        manager.write(&msg).unwrap();
        manager.write(&message(6, 2, "invoice in content")).unwrap();

        assert_eq!(manager.search("invoice", 6, 0, 10).unwrap().total, 2);

        let page = manager.syntax_search("ocr:invoice", 6, 0, 10).unwrap();
        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.messages[0].extensions[0].name, "OCR_Result");

        let page = manager.syntax_search("content:invoice", 6, 0, 10).unwrap();
        assert_eq!(ids(&page), vec![2]);
    }

    #[test]
    fn lower_case_marker_extensions_are_searchable() {
        let (_temp, manager) = manager();
        let mut msg = message(8, 1, "see attachment");
        msg.extensions = vec![MessageExtension::new("ext_custom", "zebra crossing")];
        manager.write(&msg).unwrap();

        let page = manager.search("zebra", 8, 0, 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.messages[0].extensions[0].name, "ext_custom");
        assert_eq!(manager.syntax_search("\"zebra crossing\"", 8, 0, 10).unwrap().total, 1);
    }

    #[test]
    fn registry_sees_new_fields_after_write() {
        let (_temp, manager) = manager();
        manager.write(&message(7, 1, "plain")).unwrap();
        assert_eq!(manager.search("transcript", 7, 0, 10).unwrap().total, 0);

        let mut msg = message(7, 2, "voice note");
        msg.extensions = vec![MessageExtension::new("ASR_Result", "transcript text")];
        manager.write(&msg).unwrap();
        assert_eq!(manager.search("transcript", 7, 0, 10).unwrap().total, 1);
    }

    #[test]
    fn batch_skips_empty_content_but_single_write_keeps_it() {
        let (_temp, manager) = manager();
        let report = manager.write_batch(&[
            message(8, 1, ""),
            message(8, 2, "kept"),
            message(8, 3, "  "),
        ]);
        assert_eq!(
            report,
            BatchReport {
                written: 1,
                skipped: 2,
                failed: 0
            }
        );

        manager.write(&message(8, 4, "")).unwrap();
        assert_eq!(manager.document_count(8), 2);
    }

    #[test]
    fn missing_tenant_is_empty_not_an_error() {
        let (_temp, manager) = manager();
        assert!(!manager.index_exists(42));
        assert!(manager.open_reader(42).is_none());
        assert_eq!(manager.search("anything", 42, 0, 10).unwrap(), SearchPage::default());
        manager.delete(42, 1).unwrap();
        assert!(!manager.index_exists(42));
    }

    #[test]
    fn delete_of_missing_message_is_a_no_op() {
        let (_temp, manager) = manager();
        manager.write(&message(10, 1, "keep me")).unwrap();
        manager.delete(10, 999).unwrap();
        assert_eq!(manager.document_count(10), 1);
    }

    #[test]
    fn search_all_merges_tenants() {
        let (temp, manager) = manager();
        manager.write_batch(&[
            message(1, 5, "shared topic"),
            message(2, 9, "shared topic"),
            message(2, 1, "shared topic again"),
            message(3, 4, "unrelated"),
        ]);
        fs::create_dir_all(temp.path().join("not-a-tenant")).unwrap();

        assert_eq!(manager.tenants().unwrap(), vec![1, 2, 3]);

        let page = manager.search_all("shared", 0, 2).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(ids(&page), vec![9, 5]);

        let page = manager.search_all("shared", 2, 2).unwrap();
        assert_eq!(ids(&page), vec![1]);

        let page = manager.syntax_search_all("shared AND again", 0, 10).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn search_all_skips_broken_tenants() {
        let (temp, manager) = manager();
        manager.write(&message(1, 1, "survivor")).unwrap();
        let broken = temp.path().join("2");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(META_FILE), "not json").unwrap();

        let page = manager.search_all("survivor", 0, 10).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn deleted_messages_disappear_from_search_all() {
        let (_temp, manager) = manager();
        manager.write(&message(11, 1, "ephemeral")).unwrap();
        manager.delete(11, 1).unwrap();
        let page = manager.search_all("ephemeral", 0, 10).unwrap();
        assert!(page.messages.iter().all(|m| (m.group_id, m.message_id) != (11, 1)));
    }
}
