//! Unit tests for the identifier newtypes

use core_kernel::{BlockId, Company, ExpenseId, RequestId, UserId};
use uuid::Uuid;

mod uuid_backed_ids {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_new_ids_are_time_ordered() {
        let id1 = BlockId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = BlockId::new();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(RequestId::PREFIX, "REQ");
        assert_eq!(BlockId::PREFIX, "BLK");
        assert_eq!(ExpenseId::PREFIX, "EXP");
        assert_eq!(UserId::PREFIX, "USR");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("REQ-not-a-uuid".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = ExpenseId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}

mod company {
    use super::*;

    #[test]
    fn test_company_equality_ignores_surrounding_spaces() {
        assert_eq!(Company::new("Acme "), Company::from("Acme"));
    }

    #[test]
    fn test_company_display() {
        assert_eq!(Company::new("Acme Ltda").to_string(), "Acme Ltda");
    }
}
