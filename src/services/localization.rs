//! Label tables for the display layer.
//!
//! English and Portuguese ship with the service. Any other language is
//! resolved once per session through the translation service; a failed
//! lookup keeps the English text.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::TranslationConfig;
use crate::models::datasheet::ModuleType;

pub const SOURCE_LANGUAGE: &str = "en";

const EN: &[(&str, &str)] = &[
    ("title", "Green Hydrogen Performance Predictor"),
    ("description", "Input photovoltaic module data and predict its performance under varying solar conditions."),
    ("datasheet_title", "Datasheet electrical data"),
    ("datasheet_prompt", "Enter the electrical data of the photovoltaic module!"),
    ("module_type_prompt", "Select the type of photovoltaic module to be analyzed:"),
    ("power", "Power (W):"),
    ("voltage_max", "Maximum Voltage (V):"),
    ("current_max", "Maximum Current (A):"),
    ("voltage_open", "Open-Circuit Voltage (V):"),
    ("current_short", "Short-Circuit Current (A):"),
    ("alpha", "α (%/°C):"),
    ("beta", "β (%/°C):"),
    ("gamma", "γ (%/°C):"),
    ("mu", "μ (%):"),
    ("noct", "NOCT (°C):"),
    ("cells", "Number of photovoltaic cells from the datasheet:"),
    ("diode_factor", "Diode ideality factor:"),
    ("submit", "Submit"),
    ("saved", "Data saved successfully!"),
    ("upload_prompt", "Upload the photovoltaic module datasheet (CSV)"),
    ("upload_success", "Photovoltaic module electrical data successfully loaded!"),
    ("irradiance_input", "Enter the Irradiance (W·m⁻²)"),
    ("temperature_input", "Enter the Temperature (°C)"),
    ("calculate", "Calculate"),
    ("result_imax", "Imax calculated: {} A"),
    ("result_vmax", "Vmax calculated: {} V"),
    ("result_pmax", "Pmax calculated: {} W"),
    ("download_history", "Download Updated CSV"),
    ("graphs_title", "Graphs"),
    ("graphs_description", "Comparison between the Datasheet data and the calculated results based on Irradiance and Temperature."),
    ("select_parameter", "Select the parameter to plot"),
    ("irradiance_axis", "Irradiance (W/m²)"),
    ("results_title", "Calculated Data Results"),
    ("missing_column", "The column '{}' is missing in the CSV file. Please check the file and try again."),
    ("error_csv_format", "The CSV file does not contain all the required columns. Please check the file format."),
    ("error_values", "Please enter the values correctly."),
    ("upload_both", "Please upload both files."),
    ("module_monocrystalline", "Monocrystalline (m-Si)"),
    ("module_polycrystalline", "Polycrystalline (p-Si)"),
    ("module_cdte", "Cadmium Telluride (CdTe)"),
    ("module_cigs", "Copper Indium Gallium Selenide (CIGS)"),
    ("module_perovskite", "Perovskite"),
    ("hint_alpha", "Short-Circuit Current Temperature Coefficient (α): Indicates the percentage variation of the short-circuit current with temperature."),
    ("hint_beta", "Open-Circuit Voltage Temperature Coefficient (β): Represents the percentage variation of the open-circuit voltage with temperature."),
    ("hint_gamma", "Power Temperature Coefficient (γ): Refers to the percentage variation of power with temperature."),
    ("hint_mu", "Annual degradation rate (μ): Represents the percentage decrease in module efficiency per year."),
    ("hint_noct", "Nominal Operating Cell Temperature (NOCT): The temperature the module reaches under standard test conditions (800 W/m² irradiance, 20°C ambient temperature, and 1 m/s wind speed)."),
    ("hint_cells", "Number of photovoltaic cells: Number of cells in the photovoltaic module according to the datasheet."),
    ("hint_diode_factor", "Diode ideality factor: Represents the quality of the diode in the single diode model."),
];

const PT: &[(&str, &str)] = &[
    ("title", "Modelo Preditivo de Hidrogênio Verde"),
    ("description", "Insira os dados do módulo fotovoltaico e preveja seu desempenho sob diferentes condições solares."),
    ("datasheet_title", "Dados elétricos da folha de dados"),
    ("datasheet_prompt", "Digite os dados elétricos do módulo fotovoltaico!"),
    ("module_type_prompt", "Selecione o tipo de módulo fotovoltaico a ser analisado:"),
    ("power", "Potência (W):"),
    ("voltage_max", "Tensão Máxima (V):"),
    ("current_max", "Corrente Máxima (A):"),
    ("voltage_open", "Tensão de Circuito Aberto (V):"),
    ("current_short", "Corrente de Curto-Circuito (A):"),
    ("alpha", "α (%/°C):"),
    ("beta", "β (%/°C):"),
    ("gamma", "γ (%/°C):"),
    ("mu", "μ (%):"),
    ("noct", "NOCT (°C):"),
    ("cells", "Número de células fotovoltaicas da folha de dados:"),
    ("diode_factor", "Fator de idealidade do diodo:"),
    ("submit", "Enviar"),
    ("saved", "Dados salvos com sucesso!"),
    ("upload_prompt", "Faça o upload do datasheet do módulo fotovoltaico (CSV)"),
    ("upload_success", "Dados elétricos do módulo fotovoltaico carregados com sucesso!"),
    ("irradiance_input", "Insira a Irradiância (W·m⁻²)"),
    ("temperature_input", "Insira a Temperatura (°C)"),
    ("calculate", "Calcular"),
    ("result_imax", "Imax calculado: {} A"),
    ("result_vmax", "Vmax calculado: {} V"),
    ("result_pmax", "Pmax calculado: {} W"),
    ("download_history", "Baixar CSV Atualizado"),
    ("graphs_title", "Gráficos"),
    ("graphs_description", "Comparação entre os dados do Datasheet e os resultados calculados com base na Irradiância e Temperatura."),
    ("select_parameter", "Selecione o parâmetro para plotar"),
    ("irradiance_axis", "Irradiância (W/m²)"),
    ("results_title", "Resultados dos Dados Calculados"),
    ("missing_column", "A coluna '{}' está ausente no arquivo CSV. Verifique o arquivo e tente novamente."),
    ("error_csv_format", "O arquivo CSV não contém todas as colunas necessárias. Por favor, verifique o formato do arquivo."),
    ("error_values", "Por favor, insira os valores corretamente."),
    ("upload_both", "Por favor, carregue os dois arquivos."),
    ("module_monocrystalline", "Monocristalino (m-Si)"),
    ("module_polycrystalline", "Policristalino (p-Si)"),
    ("module_cdte", "Telureto de Cádmio (CdTe)"),
    ("module_cigs", "Disseleneto de Cobre, Índio e Gálio (CIGS)"),
    ("module_perovskite", "Perovskita"),
    ("hint_alpha", "Coeficiente de temperatura da corrente de curto-circuito (α): Indica a variação percentual da corrente de curto-circuito com a temperatura."),
    ("hint_beta", "Coeficiente de temperatura da tensão de circuito aberto (β): Representa a variação percentual da tensão de circuito aberto com a temperatura."),
    ("hint_gamma", "Coeficiente de temperatura da potência (γ): Refere-se à variação percentual da potência com a temperatura."),
    ("hint_mu", "Taxa de degradação anual (μ): Representa a diminuição percentual da eficiência do módulo por ano."),
    ("hint_noct", "Temperatura nominal de operação da célula (NOCT): Temperatura que o módulo alcança em condições padrão de teste (800 W/m² de irradiância, 20°C de temperatura ambiente, e 1 m/s de velocidade do vento)."),
    ("hint_cells", "Número de células fotovoltaicas: Quantidade de células no módulo fotovoltaico conforme o datasheet."),
    ("hint_diode_factor", "Fator de idealidade do diodo: Representa a qualidade do diodo no modelo de diodo simples."),
];

/// Coefficient symbols and NOCT read the same in every language.
const UNTRANSLATED_KEYS: [&str; 5] = ["alpha", "beta", "gamma", "mu", "noct"];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LabelTable {
    pub language: String,
    pub labels: BTreeMap<String, String>,
}

impl LabelTable {
    fn from_pairs(language: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            language: language.to_string(),
            labels: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Localized name of a module technology; free-form labels pass through.
    pub fn module_type(&self, module_type: &ModuleType) -> String {
        module_type
            .label_key()
            .and_then(|key| self.get(key))
            .unwrap_or(module_type.label())
            .to_string()
    }
}

/// "pt-BR" → "pt", "" → `fallback`.
pub fn normalize_language(code: &str, fallback: &str) -> String {
    let primary = code.trim().split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    if primary.is_empty() { fallback.to_string() } else { primary }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Best-effort client for a LibreTranslate-compatible endpoint.
#[derive(Debug, Clone)]
pub struct Translator {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl Translator {
    pub fn new(cfg: &TranslationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[I18N] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        let endpoint = (cfg.enabled && !cfg.endpoint.is_empty()).then(|| cfg.endpoint.clone());
        Self { client, endpoint }
    }

    pub fn disabled() -> Self {
        Self { client: reqwest::Client::new(), endpoint: None }
    }

    async fn request(&self, endpoint: &str, text: &str, target: &str) -> Result<String, reqwest::Error> {
        let body = TranslateRequest { q: text, source: SOURCE_LANGUAGE, target, format: "text" };
        let resp = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<TranslateResponse>()
            .await?;
        Ok(resp.translated_text)
    }

    /// Translated text, or `text` itself when the service is off or fails.
    pub async fn translate(&self, text: &str, target: &str) -> String {
        let Some(endpoint) = &self.endpoint else {
            return text.to_string();
        };
        match self.request(endpoint, text, target).await {
            Ok(t) if !t.trim().is_empty() => t,
            Ok(_) => text.to_string(),
            Err(e) => {
                log::warn!("[I18N] Translation to '{}' failed, keeping original: {}", target, e);
                text.to_string()
            }
        }
    }
}

/// Build the label table for `language`. Only languages without a built-in
/// table hit the translation service, once per label.
pub async fn resolve(language: &str, translator: &Translator) -> LabelTable {
    match language {
        "en" => LabelTable::from_pairs("en", EN),
        "pt" => LabelTable::from_pairs("pt", PT),
        other => {
            let mut labels = BTreeMap::new();
            for (key, text) in EN {
                let value = if UNTRANSLATED_KEYS.contains(key) {
                    text.to_string()
                } else {
                    translator.translate(text, other).await
                };
                labels.insert(key.to_string(), value);
            }
            log::info!("[I18N] Resolved {} label(s) for '{}'", labels.len(), other);
            LabelTable { language: other.to_string(), labels }
        }
    }
}
