/// Фаза жизненного цикла пула: build -> `init` -> `shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub size: usize,
    pub active_tasks: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.active_tasks + self.idle_workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / (self.active_tasks + self.idle_workers) as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        if self.size == 0 {
            return self.queued_tasks as f64;
        }
        self.queued_tasks as f64 / self.size as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}


#[cfg(test)]
mod tests {
    use super::PoolMetrics;

    fn metrics(active: usize, idle: usize, completed: usize, failed: usize) -> PoolMetrics {
        PoolMetrics {
            size: 4,
            active_tasks: active,
            idle_workers: idle,
            queued_tasks: 8,
            total_submitted: completed + failed,
            completed_tasks: completed,
            failed_tasks: failed,
        }
    }

    #[test]
    fn test_utilization() {
        assert_eq!(metrics(0, 0, 0, 0).utilization(), 0.0);
        assert_eq!(metrics(1, 3, 0, 0).utilization(), 0.25);
        assert_eq!(metrics(4, 0, 0, 0).utilization(), 1.0);
    }

    #[test]
    fn test_success_rate_and_pressure() {
        assert_eq!(metrics(0, 0, 0, 0).success_rate(), 1.0);
        assert_eq!(metrics(0, 0, 3, 1).success_rate(), 0.75);
        assert_eq!(metrics(0, 0, 0, 0).queue_pressure(), 2.0);
    }
}
