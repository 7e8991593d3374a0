use dashmap::DashMap;
use std::sync::LazyLock;
use uuid::Uuid;

/// Stage a detached pipeline is currently in. Admission inserts `Queued`;
/// the orchestrator advances the entry at each stage boundary and removes
/// it when the run ends, so the registry only ever holds in-flight jobs.
/// Nothing reads this over the HTTP interface yet; it exists so running
/// pipelines are observable from inside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Queued,
    Extracting,
    Converting,
    Notifying,
}

pub static JOB_REGISTRY: LazyLock<DashMap<Uuid, JobStage>> = LazyLock::new(DashMap::new);

pub fn advance(id: Uuid, stage: JobStage) {
    JOB_REGISTRY.insert(id, stage);
}

pub fn finish(id: &Uuid) {
    JOB_REGISTRY.remove(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_a_job_until_it_finishes() {
        let id = Uuid::new_v4();

        advance(id, JobStage::Queued);
        assert_eq!(JOB_REGISTRY.get(&id).map(|stage| *stage), Some(JobStage::Queued));

        advance(id, JobStage::Converting);
        assert_eq!(
            JOB_REGISTRY.get(&id).map(|stage| *stage),
            Some(JobStage::Converting)
        );

        finish(&id);
        assert!(JOB_REGISTRY.get(&id).is_none());
    }
}
