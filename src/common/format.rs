// src/common/format.rs
//
// Máscaras de formulário e conversão de datas entre o formato de exibição
// (dd/mm/aaaa) e o formato de armazenamento (DATE / aaaa-mm-dd).

use chrono::NaiveDate;

pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
pub const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";

fn digits(input: &str, max: usize) -> String {
    input.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Telefone brasileiro: `(11) 9876-5432` ou `(11) 98765-4321`, aplicado
/// progressivamente enquanto o usuário digita.
pub fn format_phone(input: &str) -> String {
    let d = digits(input, 11);
    match d.len() {
        0 => String::new(),
        1..=2 => format!("({}", d),
        3..=6 => format!("({}) {}", &d[..2], &d[2..]),
        7..=10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        _ => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
    }
}

/// CEP: `12345-678`.
pub fn format_cep(input: &str) -> String {
    let d = digits(input, 8);
    if d.len() <= 5 {
        d
    } else {
        format!("{}-{}", &d[..5], &d[5..])
    }
}

/// Máscara de data digitada: `dd/mm/aaaa`.
pub fn format_date_input(input: &str) -> String {
    let d = digits(input, 8);
    match d.len() {
        0..=2 => d,
        3..=4 => format!("{}/{}", &d[..2], &d[2..]),
        _ => format!("{}/{}/{}", &d[..2], &d[2..4], &d[4..]),
    }
}

pub fn to_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn parse_display_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DISPLAY_DATE_FORMAT).ok()
}

/// Aceita tanto o formato de exibição quanto o de armazenamento.
pub fn parse_any_date(input: &str) -> Option<NaiveDate> {
    parse_display_date(input)
        .or_else(|| NaiveDate::parse_from_str(input.trim(), STORAGE_DATE_FORMAT).ok())
}

/// Data de observação: se não for possível interpretar, vale a data de hoje.
pub fn parse_observation_date(input: &str, today: NaiveDate) -> NaiveDate {
    parse_any_date(input).unwrap_or(today)
}

/// Serde: `NaiveDate` <-> "dd/mm/aaaa" (na leitura também aceita aaaa-mm-dd).
pub mod display_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_display_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_any_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("data inválida: '{}'", raw)))
    }

    /// Variante opcional: ausência vira string vazia na saída, e string vazia
    /// ou `null` na entrada viram `None`.
    pub mod option {
        use chrono::NaiveDate;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => serializer.serialize_str(&super::super::to_display_date(*date)),
                None => serializer.serialize_str(""),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => super::super::parse_any_date(value)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("data inválida: '{}'", value))),
            }
        }
    }
}
