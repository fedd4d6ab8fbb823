use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EmployeeId);
id_newtype!(RoleId);
id_newtype!(DepartmentId);

/// Meal entitlements granted to an employee. Each flag is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealAccess {
    #[serde(default, rename = "acessoCafeDaManha", alias = "AcessoCafeDaManha")]
    pub breakfast: bool,
    #[serde(default, rename = "acessoAlmoco", alias = "AcessoAlmoco")]
    pub lunch: bool,
    #[serde(default, rename = "acessoJanta", alias = "AcessoJanta")]
    pub dinner: bool,
    #[serde(default, rename = "acessoCeia", alias = "AcessoCeia")]
    pub supper: bool,
}

/// Snapshot of an employee ("colaborador") record as served by the remote API.
///
/// Snapshots are never mutated locally; selection state lives in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "id", alias = "Id")]
    pub id: EmployeeId,
    #[serde(
        default,
        rename = "nome",
        alias = "Nome",
        deserialize_with = "null_as_empty"
    )]
    pub name: String,
    #[serde(
        default,
        rename = "cartaoPonto",
        alias = "CartaoPonto",
        deserialize_with = "null_as_empty"
    )]
    pub time_card: String,
    #[serde(
        default,
        rename = "funcao",
        alias = "Funcao",
        deserialize_with = "null_as_empty"
    )]
    pub role: String,
    #[serde(
        default,
        rename = "departamento",
        alias = "Departamento",
        deserialize_with = "null_as_empty"
    )]
    pub department: String,
    #[serde(default, rename = "ativo", alias = "Ativo")]
    pub active: bool,
    #[serde(
        default,
        rename = "foto",
        alias = "Foto",
        with = "crate::protocol::photo",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<Vec<u8>>,
    #[serde(default, rename = "funcaoId", alias = "FuncaoId")]
    pub role_id: Option<RoleId>,
    #[serde(default, rename = "departamentoId", alias = "DepartamentoId")]
    pub department_id: Option<DepartmentId>,
    #[serde(flatten)]
    pub meals: MealAccess,
}

impl Employee {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId(id),
            name: name.into(),
            time_card: String::new(),
            role: String::new(),
            department: String::new(),
            active: true,
            photo: None,
            role_id: None,
            department_id: None,
            meals: MealAccess::default(),
        }
    }

    pub fn has_photo(&self) -> bool {
        self.photo.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
