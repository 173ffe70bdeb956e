//! The protocol dispatcher.
//!
//! Fresh list requests go window → query builder → reconciler → token store;
//! resumed ones go token store → reconciler → token store. Protocol errors
//! come back as [`Response::Error`]; only transport failures are `Err`.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use pmh_core::{
    fields, format_datestamp, plan, plan_list, CursorPosition, CursorReconciler, FormatDescriptor,
    HarvestRequest, ListPlan, MetadataFormat, Page, Plan, ProtocolError, ProviderConfig, Query,
    QueryBuilder, Verb, VirtualItem,
};
use pmh_logging::{pmh_debug, pmh_info, pmh_trace, pmh_warn};

use crate::error::{Failure, ProviderError};
use crate::index::{IndexQuery, IndexService, SortOrder};
use crate::response::{IdentifyInfo, ListResponse, Response, ResumptionInfo, SetEntry};
use crate::store::{system_clock, Clock, TokenDraft, TokenStore};
use crate::{IndexError, StoreError};

/// Reported when the index holds no dated record at all.
const FALLBACK_EARLIEST_DATESTAMP: &str = "1970-01-01T00:00:00Z";

#[derive(Clone)]
pub struct DataProvider {
    config: Arc<ProviderConfig>,
    index: Arc<dyn IndexService>,
    store: Arc<dyn TokenStore>,
    clock: Clock,
}

impl DataProvider {
    pub fn new(
        config: Arc<ProviderConfig>,
        index: Arc<dyn IndexService>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            index,
            store,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Answers one request.
    pub async fn handle(&self, request: &HarvestRequest) -> Result<Response, ProviderError> {
        match self.dispatch(request).await {
            Ok(response) => Ok(response),
            Err(Failure::Protocol(err)) => {
                pmh_debug!("Answering {:?} with {}", request.verb, err);
                Ok(Response::error(err))
            }
            Err(Failure::Provider(err)) => Err(err),
        }
    }

    async fn dispatch(&self, request: &HarvestRequest) -> Result<Response, Failure> {
        let now = (self.clock)();
        match plan(request, &self.config)? {
            Plan::Identify => self.identify(now).await,
            Plan::ListMetadataFormats { identifier } => {
                self.list_metadata_formats(identifier.as_deref(), now).await
            }
            Plan::ListSets => self.list_sets(now).await,
            Plan::GetRecord { identifier, format } => {
                self.get_record(&identifier, format, now).await
            }
            Plan::List(list) => self.first_page(list, now).await,
            Plan::Resume { verb, token_name } => self.resume(verb, &token_name, now).await,
        }
    }

    fn builder(&self, now: DateTime<Utc>) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.config, now.year())
    }

    fn descriptor(
        &self,
        format: MetadataFormat,
        verb: Verb,
    ) -> Result<&FormatDescriptor, ProtocolError> {
        self.config
            .formats
            .enabled_for(format, verb)
            .ok_or(ProtocolError::CannotDisseminateFormat)
    }

    /// Runs a token store call on the blocking pool; file-backed stores do
    /// synchronous IO.
    async fn with_store<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TokenStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || call(store.as_ref())).await?
    }

    /// Items the list will deliver: one per distinct discriminator value of
    /// each live record, plus one per tombstone.
    async fn count_virtual_hits(
        &self,
        predicate: &Query,
        descriptor: &FormatDescriptor,
        raw_hits: u64,
    ) -> Result<u64, IndexError> {
        let Some(field) = descriptor.version_discriminator_field.as_deref() else {
            return Ok(raw_hits);
        };
        let tombstone = Query::exists(fields::DATE_DELETED);
        let live = Query::And(vec![
            predicate.clone(),
            Query::Not(Box::new(tombstone.clone())),
        ]);
        let deleted = Query::And(vec![predicate.clone(), tombstone]);
        let variants = self.index.distinct_value_count(field, &live).await?;
        let tombstones = self.index.query(&IndexQuery::count(deleted)).await?.total;
        Ok(variants + tombstones)
    }

    async fn identify(&self, now: DateTime<Utc>) -> Result<Response, Failure> {
        let query = IndexQuery {
            predicate: self.builder(now).build_base(),
            offset: 0,
            limit: 1,
            sort: vec![(fields::DATE_UPDATED.to_string(), SortOrder::Asc)],
        };
        let result = self.index.query(&query).await?;
        let earliest_datestamp = result
            .records
            .first()
            .and_then(|record| {
                record
                    .values(fields::DATE_UPDATED)
                    .iter()
                    .filter_map(|v| v.trim().parse::<i64>().ok())
                    .min()
            })
            .and_then(format_datestamp)
            .unwrap_or_else(|| FALLBACK_EARLIEST_DATESTAMP.to_string());
        Ok(Response::Identify(IdentifyInfo {
            identity: self.config.identity.clone(),
            earliest_datestamp,
        }))
    }

    async fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Response, Failure> {
        if let Some(identifier) = identifier {
            let query = IndexQuery::count(self.builder(now).build_identifier(identifier));
            if self.index.query(&query).await?.total == 0 {
                return Err(ProtocolError::IdDoesNotExist.into());
            }
        }
        let formats: Vec<FormatDescriptor> = self.config.formats.iter_harvestable().cloned().collect();
        if formats.is_empty() {
            return Err(ProtocolError::NoMetadataFormats.into());
        }
        Ok(Response::MetadataFormats { formats })
    }

    async fn list_sets(&self, now: DateTime<Utc>) -> Result<Response, Failure> {
        let mut sets: Vec<SetEntry> = self
            .config
            .sets
            .iter()
            .map(|set| SetEntry {
                spec: set.spec.clone(),
                name: set.name.clone(),
            })
            .collect();
        let base = self.builder(now).build_base();
        for field in &self.config.all_values_sets {
            for value in self.index.field_values(field, &base).await? {
                let spec = format!("{field}:{}", value.value);
                sets.push(SetEntry {
                    name: spec.clone(),
                    spec,
                });
            }
        }
        if sets.is_empty() {
            return Err(ProtocolError::NoSetHierarchy.into());
        }
        Ok(Response::Sets { sets })
    }

    async fn get_record(
        &self,
        identifier: &str,
        format: MetadataFormat,
        now: DateTime<Utc>,
    ) -> Result<Response, Failure> {
        let descriptor = self.descriptor(format, Verb::GetRecord)?;
        let query = IndexQuery::harvest(self.builder(now).build_identifier(identifier), 0, 1);
        let record = self
            .index
            .query(&query)
            .await?
            .records
            .into_iter()
            .next()
            .ok_or(ProtocolError::IdDoesNotExist)?;

        let items = match descriptor.version_discriminator_field.as_deref() {
            Some(field) if !record.is_deleted() => {
                let variants: Vec<String> = record
                    .distinct_values(field)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                if variants.is_empty() {
                    return Err(ProtocolError::CannotDisseminateFormat.into());
                }
                variants
                    .into_iter()
                    .map(|variant| VirtualItem {
                        record: record.clone(),
                        variant: Some(variant),
                    })
                    .collect()
            }
            _ => vec![VirtualItem {
                record,
                variant: None,
            }],
        };
        Ok(Response::Record { format, items })
    }

    fn list_predicate(&self, plan: &ListPlan, descriptor: &FormatDescriptor, now: DateTime<Utc>) -> Query {
        // No date clause at all unless the client asked for a window.
        let window = (plan.request.from.is_some() || plan.request.until.is_some()).then_some(plan.window);
        self.builder(now)
            .build(descriptor, plan.set_spec.as_deref(), window)
    }

    async fn first_page(&self, plan: ListPlan, now: DateTime<Utc>) -> Result<Response, Failure> {
        let descriptor = self.descriptor(plan.format, plan.verb)?;
        let predicate = self.list_predicate(&plan, descriptor, now);
        pmh_debug!("{} predicate: {}", plan.verb, predicate);

        let raw_hits = self.index.query(&IndexQuery::count(predicate.clone())).await?.total;
        if raw_hits == 0 {
            return Err(ProtocolError::NoRecordsMatch.into());
        }
        let virtual_hits = self
            .count_virtual_hits(&predicate, descriptor, raw_hits)
            .await?;
        if virtual_hits == 0 {
            return Err(ProtocolError::NoRecordsMatch.into());
        }
        pmh_info!(
            "{} {}: {} record(s), {} item(s)",
            plan.verb,
            plan.format,
            raw_hits,
            virtual_hits
        );

        let page = self
            .fetch_page(&predicate, descriptor, CursorPosition::default(), virtual_hits)
            .await?;
        if page.items.is_empty() {
            return Err(ProtocolError::NoRecordsMatch.into());
        }
        let resumption = if page.has_more {
            let draft = TokenDraft {
                virtual_hits,
                raw_hits,
                position: page.next,
                original_request: plan.request.clone(),
            };
            let token = self
                .with_store(move |store| store.create(draft, now))
                .await?;
            pmh_debug!("Issued resumption token {}", token.token_name);
            Some(ResumptionInfo {
                token: Some(token.token_name),
                complete_list_size: virtual_hits,
                cursor: page.start.virtual_cursor,
                expiration_date: Some(token.expiration_date),
            })
        } else {
            None
        };
        Ok(Response::List(ListResponse {
            verb: plan.verb,
            format: plan.format,
            items: page.items,
            resumption,
        }))
    }

    async fn resume(&self, verb: Verb, token_name: &str, now: DateTime<Utc>) -> Result<Response, Failure> {
        let name = token_name.to_string();
        let token = self
            .with_store(move |store| store.lookup(&name, now))
            .await?
            .ok_or(ProtocolError::BadResumptionToken)?;
        if token.original_request.verb != Some(verb) {
            pmh_warn!(
                "Token {} belongs to {:?}, not {}",
                token_name,
                token.original_request.verb,
                verb
            );
            return Err(ProtocolError::BadResumptionToken.into());
        }
        // The stored request governs the selection, not the new parameters.
        let plan = plan_list(verb, &token.original_request, &self.config).map_err(|err| {
            pmh_warn!("Token {} no longer plans cleanly: {}", token_name, err);
            ProtocolError::BadResumptionToken
        })?;
        let descriptor = self
            .descriptor(plan.format, verb)
            .map_err(|_| ProtocolError::BadResumptionToken)?;
        let predicate = self.list_predicate(&plan, descriptor, now);

        let page = self
            .fetch_page(&predicate, descriptor, token.position, token.virtual_hits)
            .await?;
        if page.items.is_empty() {
            return Err(ProtocolError::NoRecordsMatch.into());
        }
        let (successor, expiration_date) = if page.has_more {
            let draft = TokenDraft {
                virtual_hits: token.virtual_hits,
                raw_hits: token.raw_hits,
                position: page.next,
                original_request: token.original_request.clone(),
            };
            let successor = self
                .with_store(move |store| store.create(draft, now))
                .await?;
            pmh_debug!("Token {} succeeded by {}", token_name, successor.token_name);
            (Some(successor.token_name), Some(successor.expiration_date))
        } else {
            let name = token.token_name.clone();
            self.with_store(move |store| store.delete(&name)).await?;
            pmh_info!("{} harvest complete after {} item(s)", verb, page.next.virtual_cursor);
            (None, None)
        };
        Ok(Response::List(ListResponse {
            verb,
            format: plan.format,
            items: page.items,
            resumption: Some(ResumptionInfo {
                token: successor,
                complete_list_size: token.virtual_hits,
                cursor: page.start.virtual_cursor,
                expiration_date,
            }),
        }))
    }

    async fn fetch_page(
        &self,
        predicate: &Query,
        descriptor: &FormatDescriptor,
        start: CursorPosition,
        virtual_hits: u64,
    ) -> Result<Page, IndexError> {
        let mut reconciler = CursorReconciler::new(
            descriptor.version_discriminator_field.as_deref(),
            self.config.hits_per_page(descriptor),
            start,
        );
        while let Some(fetch) = reconciler.next_fetch() {
            let query = IndexQuery::harvest(predicate.clone(), fetch.offset, fetch.limit);
            let result = self.index.query(&query).await?;
            pmh_trace!(
                "Fetched {} record(s) at offset {}",
                result.records.len(),
                fetch.offset
            );
            reconciler.absorb(result.records);
        }
        Ok(reconciler.finish(virtual_hits))
    }
}
