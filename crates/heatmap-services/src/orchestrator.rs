//! The daily pipeline orchestrator (§4.12, §5): one `run()` call drives a
//! single window through every stage in sequence — ingest, normalize,
//! dedupe, extract, resolve, sentiment, aggregate, axes, drivers, themes,
//! persist — exactly like the teacher's `NewsPipelineOrchestrator` drives
//! its own fetch-dedupe-process-batch loop, generalized to the
//! CREATED -> RUNNING -> {SUCCESS | PARTIAL | FAILED} state machine and the
//! ordering guarantees in §5.

use chrono::Utc;
use heatmap_core::config::PipelineConfig;
use heatmap_core::metrics_types::EntityDailyMetrics;
use heatmap_core::run::{MentionCounts, Run, RunMetrics, RunStatus, SourceCount, UnresolvedSurfaceSummary};
use heatmap_core::types::{Document, SourceItem};
use heatmap_core::window::Window;
use heatmap_db::repo::entities::CatalogIndex;
use heatmap_db::repo::mentions::MentionJoinRow;
use heatmap_db::{repo, Database, RunLedger};
use heatmap_ingest::processing::{
    dedupe, normalize, resolve, score_mentions, CapabilityProbe, FastEmbedEmbedder, LexiconSentimentModel,
    MentionExtractor,
};
use heatmap_ingest::{GdeltAdapter, QuotaTracker, RateLimitConfig, RedditAdapter, SourceAdapter, YoutubeAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::aggregate::{aggregate_entities, calibrated_attention, percentile_rank, SMALL_POPULATION_FLOOR};
use crate::axes::{compute_axes, NEUTRAL_BASELINE_FAME};
use crate::catalog::entity_name;
use crate::drivers::rank_drivers;
use crate::monitoring::MetricsCollector;
use crate::pool;
use crate::themes::themes_for_entity;

/// Everything a `run()` invocation produced, beyond the persisted rows
/// themselves — useful to the caller (CLI) for exit-code selection and a
/// human-readable summary.
pub struct RunOutcome {
    pub run: Run,
    pub entities_scored: u64,
    pub documents_ingested: u64,
}

pub struct DailyPipelineOrchestrator {
    db: Database,
    config: PipelineConfig,
    ledger: Arc<RunLedger>,
    metrics: MetricsCollector,
}

impl DailyPipelineOrchestrator {
    pub fn new(db: Database, config: PipelineConfig, ledger: RunLedger, metrics: MetricsCollector) -> Self {
        Self { db, config, ledger: Arc::new(ledger), metrics }
    }

    fn build_adapters(&self) -> Vec<Box<dyn SourceAdapter>> {
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

        if self.config.sources.reddit.enabled {
            let quota = QuotaTracker::new(self.ledger.clone(), "REDDIT", RateLimitConfig::reddit());
            adapters.push(Box::new(RedditAdapter::new(self.config.sources.reddit.clone(), quota)));
        }
        if self.config.sources.youtube.enabled {
            let daily_quota = self.config.sources.youtube.quota_ceiling.unwrap_or(10_000);
            let quota = QuotaTracker::new(self.ledger.clone(), "YOUTUBE", RateLimitConfig::youtube(daily_quota));
            let api_key = std::env::var("YOUTUBE_API_KEY").unwrap_or_default();
            adapters.push(Box::new(YoutubeAdapter::new(self.config.sources.youtube.clone(), api_key, quota)));
        }
        if self.config.sources.gdelt.enabled {
            let quota = QuotaTracker::new(self.ledger.clone(), "GDELT", RateLimitConfig::gdelt());
            adapters.push(Box::new(GdeltAdapter::new(self.config.sources.gdelt.clone(), quota)));
        }

        adapters
    }

    /// Runs the full pipeline for `window`, returning once the Run row has
    /// reached a terminal state.
    pub async fn run(&self, window: Window) -> heatmap_core::Result<RunOutcome> {
        let pool = self.db.pool();
        let mut run = Run::new(window.start, window.end, self.config.fingerprint());
        repo::runs::create_run(pool, &run).await.map_err(|e| heatmap_core::PipelineError::Persistence {
            table: "runs".to_string(),
            message: e.to_string(),
        })?;
        run.status = RunStatus::Running;
        repo::runs::transition(pool, run.run_id, RunStatus::Running, None, None).await.ok();

        let mut run_metrics = RunMetrics::new(run.run_id);
        let outcome = self.run_internal(&mut run, &mut run_metrics).await;

        let (final_status, notes) = match &outcome {
            // Zero ingested documents is only a problem if it also leaves no
            // entity_daily_metrics rows at all — pinned entities still get a
            // dormant row on an otherwise-empty window (§8 boundary case).
            // A non-fatal run that produced no usable snapshot downgrades to
            // PARTIAL, not FAILED: FAILED is reserved for fatal errors.
            Ok((_documents_ingested, entities_scored)) => {
                if *entities_scored == 0 {
                    (RunStatus::Partial, Some("no entity_daily_metrics rows produced".to_string()))
                } else {
                    (RunStatus::Success, None)
                }
            }
            Err(e) => match e.classification() {
                heatmap_core::ErrorClass::Fatal => (RunStatus::Failed, Some(e.to_string())),
                _ => (RunStatus::Partial, Some(e.to_string())),
            },
        };

        run.status = final_status;
        run.finished_at = Some(Utc::now());
        run.notes = notes.clone();
        repo::runs::transition(pool, run.run_id, final_status, run.finished_at, notes).await.ok();
        repo::metrics::upsert_run_metrics(pool, &run_metrics).await.ok();
        self.metrics.record_run_status(match final_status {
            RunStatus::Success => "SUCCESS",
            RunStatus::Partial => "PARTIAL",
            _ => "FAILED",
        });

        let (documents_ingested, entities_scored) = outcome.unwrap_or((0, 0));
        Ok(RunOutcome { run, entities_scored, documents_ingested })
    }

    /// Drives every stage; returns `(documents_ingested, entities_scored)` on
    /// a pipeline that at least started aggregating, or an error for
    /// failures that short-circuit the run (persistence, fatal invariants).
    async fn run_internal(&self, run: &mut Run, run_metrics: &mut RunMetrics) -> heatmap_core::Result<(u64, u64)> {
        let pool = self.db.pool();
        let concurrency = self.config.worker_concurrency;

        crate::catalog::sync_pinned_entities(pool, &self.config.pinned_entities).await.map_err(|e| {
            heatmap_core::PipelineError::Persistence { table: "entities".to_string(), message: e.to_string() }
        })?;
        let catalog = CatalogIndex::load(pool).await.map_err(|e| heatmap_core::PipelineError::Persistence {
            table: "entities".to_string(),
            message: e.to_string(),
        })?;
        let extractor = MentionExtractor::build(&catalog);
        let sentiment_model = LexiconSentimentModel;
        let embedder = FastEmbedEmbedder::try_new();
        let capability = CapabilityProbe::detect(embedder.is_some());

        // --- Ingest (§4.1) ---
        let stage_start = Instant::now();
        let window = Window { start: run.window_start, end: run.window_end };
        let adapters = self.build_adapters();
        let fetch_results = pool::run_bounded(adapters, concurrency, |adapter| async move {
            let tag = adapter.source_tag();
            let result = adapter.fetch(window).await;
            (tag, result)
        })
        .await;

        let mut source_items: Vec<SourceItem> = Vec::new();
        for (source_tag, result) in fetch_results {
            match result {
                Ok(items) => {
                    run_metrics.source_counts.entry(source_tag.to_string()).or_default().items += items.len() as u64;
                    self.metrics.record_source_items(source_tag, items.len() as u64);
                    source_items.extend(items);
                }
                Err(e) => {
                    tracing::error!(source = source_tag, error = %e, "ingest source failed");
                    let entry = run_metrics.source_counts.entry(source_tag.to_string()).or_default();
                    entry.errors += 1;
                    entry.error_note = Some(e.to_string());
                    self.metrics.record_source_error(source_tag);
                }
            }
        }

        for item in &source_items {
            repo::mentions::upsert_source_item(pool, item).await.ok();
        }
        run_metrics.record_stage("ingest", stage_start.elapsed().as_millis() as u64);
        self.metrics.record_stage_duration("ingest", stage_start.elapsed().as_secs_f64());

        // --- Normalize + Dedupe (§4.2, §4.3) ---
        let stage_start = Instant::now();
        let documents: Vec<Document> = source_items.iter().filter_map(normalize).collect();
        let dedupe_outcome = dedupe(documents);
        for doc in &dedupe_outcome.kept {
            repo::mentions::insert_document(pool, doc).await.ok();
        }
        run_metrics.record_stage("normalize_dedupe", stage_start.elapsed().as_millis() as u64);
        self.metrics.record_stage_duration("normalize_dedupe", stage_start.elapsed().as_secs_f64());

        let documents_ingested = dedupe_outcome.kept.len() as u64;

        // --- Extract + Resolve + Sentiment (§4.4-4.6), per document ---
        let stage_start = Instant::now();
        let mut mention_counts = MentionCounts::default();
        let mut unresolved_by_surface: HashMap<String, (u64, String)> = HashMap::new();
        let mut doc_ids: Vec<Uuid> = Vec::with_capacity(dedupe_outcome.kept.len());

        for doc in &dedupe_outcome.kept {
            doc_ids.push(doc.doc_id);
            let candidates = extractor.extract(doc, &catalog);
            let mut resolution = resolve(&candidates, doc, &catalog, &self.config.weights);
            score_mentions(&mut resolution.mentions, doc, &sentiment_model);

            mention_counts.total += resolution.mentions.len() as u64 + resolution.unresolved.len() as u64;
            mention_counts.resolved += resolution.mentions.len() as u64;
            mention_counts.implicit += resolution.mentions.iter().filter(|m| m.is_implicit).count() as u64;
            mention_counts.unresolved += resolution.unresolved.len() as u64;

            for mention in &resolution.mentions {
                repo::mentions::insert_mention(pool, mention).await.map_err(|e| heatmap_core::PipelineError::Persistence {
                    table: "mentions".to_string(),
                    message: e.to_string(),
                })?;
            }
            for unresolved in &resolution.unresolved {
                let entry = unresolved_by_surface.entry(unresolved.surface_norm.clone()).or_insert((0, unresolved.context_snippet.clone()));
                entry.0 += 1;
                repo::mentions::insert_unresolved(pool, unresolved).await.ok();
            }
        }
        self.metrics.record_mentions("resolved", mention_counts.resolved);
        self.metrics.record_mentions("unresolved", mention_counts.unresolved);
        run_metrics.mention_counts = mention_counts;

        let mut unresolved_top: Vec<UnresolvedSurfaceSummary> = unresolved_by_surface
            .into_iter()
            .map(|(surface_norm, (occurrences, sample_context))| UnresolvedSurfaceSummary { surface_norm, occurrences, sample_context })
            .collect();
        unresolved_top.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        unresolved_top.truncate(20);
        run_metrics.unresolved_top = unresolved_top;

        run_metrics.record_stage("extract_resolve_sentiment", stage_start.elapsed().as_millis() as u64);
        self.metrics.record_stage_duration("extract_resolve_sentiment", stage_start.elapsed().as_secs_f64());

        // --- Aggregate (§4.7) ---
        let stage_start = Instant::now();
        let rows: Vec<MentionJoinRow> = repo::mentions::mentions_for_docs(pool, &doc_ids).await.map_err(|e| {
            heatmap_core::PipelineError::Persistence { table: "mentions".to_string(), message: e.to_string() }
        })?;

        let mut rows_by_entity: HashMap<Uuid, Vec<MentionJoinRow>> = HashMap::new();
        for row in &rows {
            rows_by_entity.entry(row.entity_id).or_default().push(row.clone());
        }

        let aggregates = aggregate_entities(&rows, &self.config.weights);
        run_metrics.record_stage("aggregate", stage_start.elapsed().as_millis() as u64);
        self.metrics.record_stage_duration("aggregate", stage_start.elapsed().as_secs_f64());

        // Every pinned, active entity gets a row even with zero mentions
        // (dormant); §3 "entity_daily_metrics exists for every entity that
        // has any resolved mention in the window plus every pinned active
        // entity".
        let mut entity_ids: std::collections::HashSet<Uuid> = aggregates.keys().copied().collect();
        for (id, entity) in &catalog.entities {
            if entity.pinned && entity.active {
                entity_ids.insert(*id);
            }
        }

        if entity_ids.is_empty() {
            return Ok((documents_ingested, 0));
        }

        // --- Axis computation, drivers, themes (§4.8, §4.10, §4.11) ---
        let stage_start = Instant::now();
        let attention_population: Vec<(Uuid, f64)> = aggregates.values().map(|a| (a.entity_id, a.attention_raw())).collect();
        let use_percentile = attention_population.len() >= SMALL_POPULATION_FLOOR;
        let percentile_normalized = if use_percentile { percentile_rank(&attention_population) } else { HashMap::new() };

        let mut entities_scored: u64 = 0;
        for entity_id in &entity_ids {
            let owned_empty;
            let agg = match aggregates.get(entity_id) {
                Some(a) => a,
                None => {
                    owned_empty = crate::aggregate::EntityAggregate::new(*entity_id);
                    &owned_empty
                }
            };
            let attention_normalized = if use_percentile {
                percentile_normalized.get(entity_id).copied().unwrap_or(50.0)
            } else {
                calibrated_attention(agg.attention_raw(), self.config.weights.confidence_volume_scale_k)
            };

            let baseline_fame = repo::baseline::latest_combined(pool, *entity_id)
                .await
                .ok()
                .flatten()
                .map(|b| b.baseline_fame)
                .unwrap_or(NEUTRAL_BASELINE_FAME);

            let prior_axes = repo::metrics::prior_axes(pool, *entity_id, run.window_end, self.config.weights.momentum_history_requirement as i64 + 4)
                .await
                .unwrap_or_default();

            let metrics_row: EntityDailyMetrics =
                compute_axes(run.run_id, agg, attention_normalized, baseline_fame, &prior_axes, &self.config.weights);
            repo::metrics::insert_entity_daily_metrics(pool, &metrics_row).await.map_err(|e| {
                heatmap_core::PipelineError::Persistence { table: "entity_daily_metrics".to_string(), message: e.to_string() }
            })?;

            let entity_rows = rows_by_entity.get(entity_id).map(Vec::as_slice).unwrap_or(&[]);
            let name = entity_name(&catalog, *entity_id).to_string();
            let drivers = rank_drivers(run.run_id, *entity_id, &name, entity_rows, self.config.weights.driver_count);
            repo::drivers::insert_drivers(pool, &drivers).await.ok();

            let themes = themes_for_entity(
                run.run_id,
                *entity_id,
                entity_rows,
                self.config.weights.theme_count,
                self.config.weights.theme_min_mentions,
                &capability,
                embedder.as_ref().map(|e| e as &dyn heatmap_ingest::processing::SentenceEmbedder),
            );
            repo::themes::insert_themes(pool, &themes).await.ok();

            entities_scored += 1;
        }
        self.metrics.record_entities_scored(entities_scored);
        run_metrics.record_stage("axes_drivers_themes", stage_start.elapsed().as_millis() as u64);
        self.metrics.record_stage_duration("axes_drivers_themes", stage_start.elapsed().as_secs_f64());

        Ok((documents_ingested, entities_scored))
    }
}
