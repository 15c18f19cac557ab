//! Canonical Enumerations
//!
//! Every enumerated domain value (sector, absence type, loss type, ...)
//! accepts multiple human-facing spellings: accented and unaccented
//! Portuguese labels, legacy codes, mixed case. All of them resolve to a
//! single canonical code through one shared lookup mechanism, keyed by a
//! normalized (diacritic-stripped, uppercased) input form. Inputs missing
//! from a table fail canonicalization and are rejected by validation.

use serde::{Deserialize, Serialize};

/// Normalize an input spelling into the lookup key: diacritics folded to
/// ASCII, uppercased, runs of non-alphanumerics collapsed to `_`.
pub fn normalize_key(input: &str) -> String {
    let mut key = String::with_capacity(input.len());
    let mut last_sep = true;

    for c in input.chars() {
        let folded = fold_char(c);
        if folded.is_ascii_alphanumeric() {
            key.push(folded.to_ascii_uppercase());
            last_sep = false;
        } else if !last_sep {
            key.push('_');
            last_sep = true;
        }
    }

    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Fold a single character to its ASCII base form.
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Defines a canonical enumeration: variants, their canonical codes, and
/// extra accepted lookup keys (already in normalized form).
macro_rules! canon_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident = $code:literal $(, aliases: [ $($alias:literal),* ] )? );+ $(;)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Canonicalize an accepted spelling; `None` on lookup miss.
            pub fn from_input(input: &str) -> Option<Self> {
                match normalize_key(input).as_str() {
                    $(
                        $code => Some(Self::$variant),
                        $( $( $alias => Some(Self::$variant), )* )?
                    )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

canon_enum! {
    /// Production sector of the plant.
    Sector {
        Confeitaria = "CONFEITARIA";
        Paes = "PAES";
        Salgado = "SALGADO", aliases: ["SALGADOS"];
        PaoDeQueijo = "PAO_DE_QUEIJO", aliases: ["PDQ"];
        Embaladora = "EMBALADORA", aliases: ["EMBALAGEM"];
        Manutencao = "MANUTENCAO";
    }
}

canon_enum! {
    /// Reason an employee was absent.
    AbsenceType {
        FaltaJustificada = "FALTA_JUSTIFICADA", aliases: ["JUSTIFICADA"];
        FaltaInjustificada = "FALTA_INJUSTIFICADA", aliases: ["INJUSTIFICADA", "FALTA"];
        Atestado = "ATESTADO", aliases: ["ATESTADO_MEDICO"];
        Ferias = "FERIAS";
        Licenca = "LICENCA", aliases: ["LICENCA_MEDICA"];
    }
}

canon_enum! {
    /// What kind of material was lost.
    LossType {
        Massa = "MASSA";
        MateriaPrima = "MATERIA_PRIMA";
        ProdutoAcabado = "PRODUTO_ACABADO";
        Embalagem = "EMBALAGEM";
    }
}

canon_enum! {
    /// Where a production error was detected.
    ErrorCategory {
        Producao = "PRODUCAO";
        Embalagem = "EMBALAGEM";
        Qualidade = "QUALIDADE";
        Expedicao = "EXPEDICAO";
    }
}

canon_enum! {
    MaintenanceType {
        Preventiva = "PREVENTIVA";
        Corretiva = "CORRETIVA";
        Preditiva = "PREDITIVA";
    }
}

canon_enum! {
    MachineStatus {
        Operando = "OPERANDO", aliases: ["ATIVA", "ATIVO", "EM_OPERACAO"];
        Manutencao = "MANUTENCAO", aliases: ["EM_MANUTENCAO"];
        Parada = "PARADA", aliases: ["PARADO", "INATIVA"];
    }
}

canon_enum! {
    Shift {
        Manha = "MANHA";
        Tarde = "TARDE";
        Noite = "NOITE";
    }
}

canon_enum! {
    /// Access role of a back-office user.
    Role {
        Admin = "ADMIN";
        SupervisorProducao = "SUPERVISOR_PRODUCAO", aliases: ["SUPERVISOR"];
        SupervisorQualidade = "SUPERVISOR_QUALIDADE";
        LiderProducao = "LIDER_PRODUCAO", aliases: ["LIDER"];
        Espectador = "ESPECTADOR", aliases: ["VISUALIZADOR", "VIEWER"];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Pães"), "PAES");
        assert_eq!(normalize_key("pão de queijo"), "PAO_DE_QUEIJO");
        assert_eq!(normalize_key("Matéria-Prima"), "MATERIA_PRIMA");
        assert_eq!(normalize_key("  Manutenção  "), "MANUTENCAO");
        assert_eq!(normalize_key("PAO--DE--QUEIJO"), "PAO_DE_QUEIJO");
    }

    #[test]
    fn test_sector_accepts_accented_and_plain() {
        assert_eq!(Sector::from_input("Pães"), Some(Sector::Paes));
        assert_eq!(Sector::from_input("Paes"), Some(Sector::Paes));
        assert_eq!(Sector::from_input("PAES"), Some(Sector::Paes));
        assert_eq!(Sector::from_input("Pão de Queijo"), Some(Sector::PaoDeQueijo));
        assert_eq!(Sector::from_input("pao-de-queijo"), Some(Sector::PaoDeQueijo));
        assert_eq!(Sector::from_input("Manutenção"), Some(Sector::Manutencao));
    }

    #[test]
    fn test_sector_rejects_unknown() {
        assert_eq!(Sector::from_input("Padaria Central"), None);
        assert_eq!(Sector::from_input(""), None);
    }

    #[test]
    fn test_absence_type_aliases() {
        assert_eq!(AbsenceType::from_input("Atestado Médico"), Some(AbsenceType::Atestado));
        assert_eq!(AbsenceType::from_input("Falta Justificada"), Some(AbsenceType::FaltaJustificada));
        assert_eq!(AbsenceType::from_input("Férias"), Some(AbsenceType::Ferias));
        assert_eq!(AbsenceType::from_input("licença"), Some(AbsenceType::Licenca));
    }

    #[test]
    fn test_loss_type() {
        assert_eq!(LossType::from_input("Matéria-Prima"), Some(LossType::MateriaPrima));
        assert_eq!(LossType::from_input("Produto Acabado"), Some(LossType::ProdutoAcabado));
    }

    #[test]
    fn test_machine_status_aliases() {
        assert_eq!(MachineStatus::from_input("Em Manutenção"), Some(MachineStatus::Manutencao));
        assert_eq!(MachineStatus::from_input("Ativa"), Some(MachineStatus::Operando));
    }

    #[test]
    fn test_serde_uses_canonical_code() {
        let json = serde_json::to_string(&Sector::PaoDeQueijo).unwrap();
        assert_eq!(json, "\"PAO_DE_QUEIJO\"");

        let back: Sector = serde_json::from_str("\"PAO_DE_QUEIJO\"").unwrap();
        assert_eq!(back, Sector::PaoDeQueijo);
    }

    #[test]
    fn test_role_canonicalization() {
        assert_eq!(Role::from_input("espectador"), Some(Role::Espectador));
        assert_eq!(Role::from_input("Supervisor"), Some(Role::SupervisorProducao));
        assert_eq!(Role::from_input("Líder"), Some(Role::LiderProducao));
    }
}
