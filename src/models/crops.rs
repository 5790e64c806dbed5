// src/models/crops.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::not_blank;
use crate::models::{Collection, Patchable, Record, dashboard::DashboardData};

// --- Enum de estágios (ordenado) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "crop_status")]
pub enum CropStatus {
    Planted,
    Germinated,
    Growing,
    Flowering,
    Fruiting,
    #[serde(rename = "Ready to Harvest")]
    #[sqlx(rename = "Ready to Harvest")]
    ReadyToHarvest,
    Harvested,
}

impl CropStatus {
    pub const ALL: [CropStatus; 7] = [
        CropStatus::Planted,
        CropStatus::Germinated,
        CropStatus::Growing,
        CropStatus::Flowering,
        CropStatus::Fruiting,
        CropStatus::ReadyToHarvest,
        CropStatus::Harvested,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CropStatus::Planted => "Planted",
            CropStatus::Germinated => "Germinated",
            CropStatus::Growing => "Growing",
            CropStatus::Flowering => "Flowering",
            CropStatus::Fruiting => "Fruiting",
            CropStatus::ReadyToHarvest => "Ready to Harvest",
            CropStatus::Harvested => "Harvested",
        }
    }
}

impl fmt::Display for CropStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tabela fixa estágio -> % de crescimento.
/// Usada tanto na troca de estágio quanto na prévia do formulário de criação.
pub fn growth_for(status: CropStatus) -> i32 {
    match status {
        CropStatus::Planted => 0,
        CropStatus::Germinated => 10,
        CropStatus::Growing => 35,
        CropStatus::Flowering => 60,
        CropStatus::Fruiting => 80,
        CropStatus::ReadyToHarvest => 95,
        CropStatus::Harvested => 100,
    }
}

// --- Cultura (linha da tabela 'crops') ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub status: CropStatus,
    // Derivado de `status`, nunca editado sozinho
    pub growth: i32,
    pub created_at: DateTime<Utc>,
}

impl Crop {
    /// Troca o estágio e recalcula o crescimento no mesmo passo.
    pub fn set_status(&mut self, status: CropStatus) {
        self.status = status;
        self.growth = growth_for(status);
    }
}

// Formulário de criação
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCrop {
    #[validate(custom(function = "not_blank", message = "O nome da cultura é obrigatório."))]
    pub name: String,
    #[serde(default = "default_status")]
    pub status: CropStatus,
}

fn default_status() -> CropStatus {
    CropStatus::Planted
}

impl NewCrop {
    pub fn new(name: impl Into<String>, status: CropStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Prévia do crescimento exibida no formulário.
    pub fn growth_preview(&self) -> i32 {
        growth_for(self.status)
    }
}

// Atualização parcial. Não há campo `growth`: ele sempre acompanha `status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropPatch {
    pub name: Option<String>,
    pub status: Option<CropStatus>,
}

impl CropPatch {
    pub fn status(status: CropStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Crescimento que será gravado junto com o novo estágio.
    pub fn growth(&self) -> Option<i32> {
        self.status.map(growth_for)
    }
}

impl Patchable<Crop> for CropPatch {
    fn apply(&self, crop: &mut Crop) {
        if let Some(name) = &self.name {
            crop.name = name.clone();
        }
        if let Some(status) = self.status {
            crop.set_status(status);
        }
    }

    fn revert(&self, crop: &mut Crop, snapshot: &Crop) {
        if self.name.is_some() {
            crop.name = snapshot.name.clone();
        }
        if self.status.is_some() {
            crop.status = snapshot.status;
            crop.growth = snapshot.growth;
        }
    }
}

impl Record for Crop {
    type New = NewCrop;
    type Patch = CropPatch;

    const COLLECTION: Collection = Collection::Crops;

    fn id(&self) -> Uuid {
        self.id
    }

    fn rows(data: &DashboardData) -> &Vec<Self> {
        &data.crops
    }

    fn rows_mut(data: &mut DashboardData) -> &mut Vec<Self> {
        &mut data.crops
    }
}
