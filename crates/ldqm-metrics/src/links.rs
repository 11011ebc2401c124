use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use ldqm_core::{Statement, extract_dataset_ns, is_persistent_url, is_possible_url, pay_level_domain};
use ldqm_sampling::ReservoirSampler;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::AssessmentConfig;
use crate::context::DerefContext;
use crate::errors::Result;
use crate::metric::{ProblemItem, ProblemKind, QualityMetric};

const LINK_STREAM_BASE: u64 = 16;

/// Number of external data sources, by dataset namespace, that serve RDF
/// for at least one sampled link.
///
/// Object IRIs outside the assessed dataset's pay-level domain are grouped
/// by namespace, each group sampled by its own reservoir. `purl.org` and
/// `w3id.org` links are credited to the namespace they redirect to.
pub struct EstimatedLinkExternalDataProviders {
    context: Arc<DerefContext>,
    config: AssessmentConfig,
    local_pld: Option<String>,
    samplers: BTreeMap<String, ReservoirSampler<String, ChaCha8Rng>>,
    persistent: HashMap<String, Option<String>>,
    triples: u64,
    local_links: u64,
    providers: Option<BTreeSet<String>>,
    problems: Vec<ProblemItem>,
}

impl EstimatedLinkExternalDataProviders {
    pub fn new(context: Arc<DerefContext>, config: &AssessmentConfig) -> Result<Self> {
        Ok(Self {
            context,
            config: config.clone(),
            local_pld: config.dataset_uri.as_deref().and_then(pay_level_domain),
            samplers: BTreeMap::new(),
            persistent: HashMap::new(),
            triples: 0,
            local_links: 0,
            providers: None,
            problems: Vec::new(),
        })
    }

    /// Namespaces confirmed to serve RDF, once computed.
    pub fn providers(&self) -> Option<&BTreeSet<String>> {
        self.providers.as_ref()
    }

    fn is_local(&self, uri: &str) -> bool {
        match &self.local_pld {
            Some(local) => pay_level_domain(uri).as_deref() == Some(local.as_str()),
            None => false,
        }
    }

    fn sample(&mut self, uri: &str) -> Result<()> {
        let namespace = extract_dataset_ns(uri).to_string();
        if is_persistent_url(uri) {
            self.persistent.entry(namespace.clone()).or_insert(None);
        }
        if !self.samplers.contains_key(&namespace) {
            let stream = LINK_STREAM_BASE + self.samplers.len() as u64;
            let sampler = ReservoirSampler::with_rng(
                self.config.sampling.reservoir_size,
                true,
                self.config.rng(stream),
            )?;
            self.samplers.insert(namespace.clone(), sampler);
        }
        if let Some(sampler) = self.samplers.get(&namespace) {
            sampler.add_if_absent(uri.to_string());
        }
        Ok(())
    }

    fn target_namespace(&mut self, namespace: &str, sample: &str) -> String {
        let Some(resolved) = self.persistent.get(namespace) else {
            return namespace.to_string();
        };
        if let Some(target) = resolved {
            return target.clone();
        }

        let target_url = self.context.fetcher().resolve_persistent_url(sample);
        let target = extract_dataset_ns(&target_url).to_string();
        debug!(namespace, target = %target, "persistent namespace resolved");
        self.persistent
            .insert(namespace.to_string(), Some(target.clone()));
        target
    }

    /// Dereferences every sampled link through the shared pool in one drain,
    /// then credits each namespace with at least one link serving RDF.
    fn check_providers(&mut self) -> Result<BTreeSet<String>> {
        let groups: Vec<(String, Vec<String>)> = self
            .samplers
            .iter()
            .map(|(namespace, sampler)| (namespace.clone(), sampler.items()))
            .collect();

        let report = self
            .context
            .drain(groups.iter().flat_map(|(_, sample)| sample.iter()))?;
        let serving: HashSet<&str> = report
            .resolved
            .iter()
            .filter(|(_, outcome)| outcome.parsable)
            .map(|(uri, _)| uri.as_str())
            .collect();
        debug!(
            links = report.assessed(),
            serving = serving.len(),
            unresolved = report.unresolved.len(),
            "external links dereferenced"
        );

        let mut providers = BTreeSet::new();
        for (namespace, sample) in &groups {
            let Some(first) = sample.first() else {
                continue;
            };
            let mut serves_rdf = false;
            for uri in sample {
                if serving.contains(uri.as_str()) {
                    serves_rdf = true;
                } else {
                    self.problems.push(ProblemItem::new(
                        uri.as_str(),
                        ProblemKind::NoRdfForExternalLink,
                    ));
                }
            }
            if serves_rdf {
                let target = self.target_namespace(namespace, first);
                providers.insert(target);
            }
        }
        Ok(providers)
    }
}

impl QualityMetric for EstimatedLinkExternalDataProviders {
    fn name(&self) -> &'static str {
        "estimated_link_external_data_providers"
    }

    fn compute(&mut self, statement: &Statement) -> Result<()> {
        if statement.is_type_declaration() {
            return Ok(());
        }
        self.triples += 1;
        let Some(object) = statement.object.as_iri() else {
            return Ok(());
        };
        if !is_possible_url(object) {
            return Ok(());
        }
        if self.is_local(object) {
            self.local_links += 1;
            return Ok(());
        }
        self.sample(object)
    }

    /// A count of data sources rather than a ratio.
    fn metric_value(&mut self) -> Result<f64> {
        if self.providers.is_none() {
            let providers = self.check_providers()?;
            info!(
                namespaces = self.samplers.len(),
                providers = providers.len(),
                "external data providers checked"
            );
            self.providers = Some(providers);
        }
        Ok(self.providers.as_ref().map_or(0, BTreeSet::len) as f64)
    }

    fn is_estimate(&self) -> bool {
        true
    }

    fn problems(&self) -> &[ProblemItem] {
        &self.problems
    }

    fn counters(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("triples_assessed", self.triples),
            ("local_links", self.local_links),
            ("external_namespaces", self.samplers.len() as u64),
        ])
    }
}
