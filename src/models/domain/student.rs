use serde::{Deserialize, Serialize};

/// Roster member as returned by the roster provider. Read-only here.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Student {
    #[serde(rename = "user_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Student {
    pub fn new(id: &str, first_name: &str, last_name: &str, email: &str) -> Self {
        Student {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_full_name() {
        let student = Student::new("s1", "Camila", "Rojas", "camila@example.com");
        assert_eq!(student.full_name(), "Camila Rojas");
    }

    #[test]
    fn test_student_reads_roster_field_names() {
        let json = r#"{"user_id":"s7","first_name":"Diego","last_name":"Soto",
            "email":"d@example.com"}"#;
        let student: Student = serde_json::from_str(json).expect("student should deserialize");
        assert_eq!(student.id, "s7");
        assert_eq!(student.last_name, "Soto");
    }
}
