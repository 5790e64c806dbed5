// src/models/dashboard.rs

use serde::Serialize;

use crate::models::{crops::Crop, employees::Employee, inventory::InventoryItem, tasks::Task};

/// As quatro coleções de uma conta, carregadas juntas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardData {
    pub crops: Vec<Crop>,
    pub tasks: Vec<Task>,
    pub inventory: Vec<InventoryItem>,
    pub employees: Vec<Employee>,
}

/// Estado observável do carregador: `{ crops, tasks, inventory, employees, loadingData, error }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataState {
    pub data: DashboardData,
    pub loading_data: bool,
    pub error: Option<String>,
}

// Resumo exibido na página inicial (três primeiros de cada coleção)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub crops: Vec<Crop>,
    pub tasks: Vec<Task>,
    pub inventory: Vec<InventoryItem>,
    pub employees: Vec<Employee>,
    pub low_stock_count: usize,
    pub pending_task_count: usize,
}
