use log::{debug, warn};


/// Best-effort привязка текущего потока к ядру `worker_id % cores`.
///
/// Возвращает `false` если платформа не отдаёт список ядер или привязка
/// не удалась. На планирование задач это не влияет.
pub fn pin_current_thread(worker_id: usize) -> bool {
    let cores = match core_affinity::get_core_ids() {
        Some(v) if !v.is_empty() => v,
        _ => {
            warn!("worker {}: core ids unavailable, skipping affinity", worker_id);
            return false;
        }
    };

    let core = cores[worker_id % cores.len()];
    if !core_affinity::set_for_current(core) {
        warn!("worker {}: failed to pin to core {}", worker_id, core.id);
        return false;
    }

    debug!("worker {} pinned to core {}", worker_id, core.id);
    true
}
