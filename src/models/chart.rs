use serde::Serialize;

/// Cor única ou paleta (gráficos de rosca usam uma cor por fatia)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Paint {
    Single(String),
    Palette(Vec<String>),
}

/// Série no formato consumido pelo front-end (Chart.js)
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

impl ChartDataset {
    pub fn values(data: Vec<i64>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    /// Gráfico vazio com um único rótulo (ex.: "No Group Selected")
    pub fn placeholder(label: &str, datasets: Vec<ChartDataset>) -> Self {
        Self {
            labels: vec![label.to_string()],
            datasets,
        }
    }
}
