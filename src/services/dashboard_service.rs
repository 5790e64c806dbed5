// src/services/dashboard_service.rs

use crate::models::dashboard::{DashboardData, DashboardSummary};

// Quantos itens de cada coleção aparecem no painel inicial
const PREVIEW_LEN: usize = 3;

#[derive(Clone, Default)]
pub struct DashboardService;

impl DashboardService {
    pub fn new() -> Self {
        Self
    }

    pub fn get_summary(&self, data: &DashboardData) -> DashboardSummary {
        DashboardSummary {
            crops: data.crops.iter().take(PREVIEW_LEN).cloned().collect(),
            tasks: data.tasks.iter().take(PREVIEW_LEN).cloned().collect(),
            inventory: data.inventory.iter().take(PREVIEW_LEN).cloned().collect(),
            employees: data.employees.iter().take(PREVIEW_LEN).cloned().collect(),
            low_stock_count: data.inventory.iter().filter(|i| i.is_low()).count(),
            pending_task_count: data.tasks.iter().filter(|t| !t.completed).count(),
        }
    }
}
