use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnrichError;

pub const COLUMNS: [&str; 20] = [
    "cnpj",
    "nome",
    "fantasia",
    "situacao",
    "tipo",
    "porte",
    "natureza_juridica",
    "atividade_principal",
    "logradouro",
    "numero",
    "complemento",
    "municipio",
    "bairro",
    "uf",
    "cep",
    "email",
    "telefone",
    "capital_social",
    "optante_simples",
    "optante_simei",
];

pub const TEXT_COLUMNS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub cnpj: String,
    pub nome: String,
    pub fantasia: String,
    pub situacao: String,
    pub tipo: String,
    pub porte: String,
    pub natureza_juridica: String,
    pub atividade_principal: String,
    pub logradouro: String,
    pub numero: String,
    pub complemento: String,
    pub municipio: String,
    pub bairro: String,
    pub uf: String,
    pub cep: String,
    pub email: String,
    pub telefone: String,
    pub capital_social: String,
    pub optante_simples: Option<bool>,
    pub optante_simei: Option<bool>,
}

impl CompanyRecord {
    /// Only `atividade_principal`, `simples` and `simei` may be absent.
    pub fn from_payload(raw: &Value) -> Result<Self, EnrichError> {
        let atividade_principal = raw
            .get("atividade_principal")
            .and_then(|value| value.as_array())
            .and_then(|array| array.first())
            .and_then(|value| value.get("text"))
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            cnpj: required_text(raw, "cnpj")?,
            nome: required_text(raw, "nome")?,
            fantasia: required_text(raw, "fantasia")?,
            situacao: required_text(raw, "situacao")?,
            tipo: required_text(raw, "tipo")?,
            porte: required_text(raw, "porte")?,
            natureza_juridica: required_text(raw, "natureza_juridica")?,
            atividade_principal,
            logradouro: required_text(raw, "logradouro")?,
            numero: required_text(raw, "numero")?,
            complemento: required_text(raw, "complemento")?,
            municipio: required_text(raw, "municipio")?,
            bairro: required_text(raw, "bairro")?,
            uf: required_text(raw, "uf")?,
            cep: required_text(raw, "cep")?,
            email: required_text(raw, "email")?,
            telefone: required_text(raw, "telefone")?,
            capital_social: required_text(raw, "capital_social")?,
            optante_simples: optional_flag(raw, "simples"),
            optante_simei: optional_flag(raw, "simei"),
        })
    }

    pub fn text_fields(&self) -> [&str; TEXT_COLUMNS] {
        [
            self.cnpj.as_str(),
            self.nome.as_str(),
            self.fantasia.as_str(),
            self.situacao.as_str(),
            self.tipo.as_str(),
            self.porte.as_str(),
            self.natureza_juridica.as_str(),
            self.atividade_principal.as_str(),
            self.logradouro.as_str(),
            self.numero.as_str(),
            self.complemento.as_str(),
            self.municipio.as_str(),
            self.bairro.as_str(),
            self.uf.as_str(),
            self.cep.as_str(),
            self.email.as_str(),
            self.telefone.as_str(),
            self.capital_social.as_str(),
        ]
    }

    pub fn from_row(
        text: [String; TEXT_COLUMNS],
        optante_simples: Option<bool>,
        optante_simei: Option<bool>,
    ) -> Self {
        let [
            cnpj,
            nome,
            fantasia,
            situacao,
            tipo,
            porte,
            natureza_juridica,
            atividade_principal,
            logradouro,
            numero,
            complemento,
            municipio,
            bairro,
            uf,
            cep,
            email,
            telefone,
            capital_social,
        ] = text;
        Self {
            cnpj,
            nome,
            fantasia,
            situacao,
            tipo,
            porte,
            natureza_juridica,
            atividade_principal,
            logradouro,
            numero,
            complemento,
            municipio,
            bairro,
            uf,
            cep,
            email,
            telefone,
            capital_social,
            optante_simples,
            optante_simei,
        }
    }
}

fn required_text(raw: &Value, key: &str) -> Result<String, EnrichError> {
    match raw.get(key) {
        None => Err(EnrichError::MissingField(key.to_string())),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
    }
}

fn optional_flag(raw: &Value, section: &str) -> Option<bool> {
    raw.get(section)
        .and_then(|value| value.get("optante"))
        .and_then(|value| value.as_bool())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn payload() -> Value {
        json!({
            "status": "OK",
            "cnpj": "12.345.678/0001-99",
            "nome": "ACME LTDA",
            "fantasia": "ACME",
            "situacao": "ATIVA",
            "tipo": "MATRIZ",
            "porte": "ME",
            "natureza_juridica": "206-2 - Sociedade Empresária Limitada",
            "atividade_principal": [{"code": "62.01-5-01", "text": "Desenvolvimento de software"}],
            "logradouro": "RUA A",
            "numero": "10",
            "complemento": "",
            "municipio": "SAO PAULO",
            "bairro": "CENTRO",
            "uf": "SP",
            "cep": "01.001-000",
            "email": "contato@acme.test",
            "telefone": "(11) 5555-0000",
            "capital_social": "10000.00",
            "simples": {"optante": true},
            "simei": {"optante": false}
        })
    }

    #[test]
    fn maps_complete_payload() {
        let record = CompanyRecord::from_payload(&payload()).unwrap();
        assert_eq!(record.cnpj, "12.345.678/0001-99");
        assert_eq!(record.atividade_principal, "Desenvolvimento de software");
        assert_eq!(record.optante_simples, Some(true));
        assert_eq!(record.optante_simei, Some(false));
    }

    #[test]
    fn empty_primary_activity_maps_to_empty_text() {
        let mut raw = payload();
        raw["atividade_principal"] = json!([]);
        let record = CompanyRecord::from_payload(&raw).unwrap();
        assert_eq!(record.atividade_principal, "");
    }

    #[test]
    fn missing_regime_sections_map_to_none() {
        let mut raw = payload();
        let object = raw.as_object_mut().unwrap();
        object.remove("simples");
        object.remove("simei");
        let record = CompanyRecord::from_payload(&raw).unwrap();
        assert_eq!(record.optante_simples, None);
        assert_eq!(record.optante_simei, None);
    }

    #[test]
    fn missing_required_field_fails() {
        let mut raw = payload();
        raw.as_object_mut().unwrap().remove("municipio");
        let err = CompanyRecord::from_payload(&raw).unwrap_err();
        assert_matches!(err, EnrichError::MissingField(key) if key == "municipio");
    }

    #[test]
    fn coerces_null_and_numbers() {
        let mut raw = payload();
        raw["email"] = Value::Null;
        raw["capital_social"] = json!(1500.5);
        let record = CompanyRecord::from_payload(&raw).unwrap();
        assert_eq!(record.email, "");
        assert_eq!(record.capital_social, "1500.5");
    }

    #[test]
    fn text_fields_follow_column_order() {
        let record = CompanyRecord::from_payload(&payload()).unwrap();
        let fields = record.text_fields();
        assert_eq!(fields[0], record.cnpj);
        assert_eq!(fields[7], record.atividade_principal);
        assert_eq!(fields[TEXT_COLUMNS - 1], record.capital_social);
        assert_eq!(COLUMNS[TEXT_COLUMNS], "optante_simples");
    }
}
