use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn fixture(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn coursepay() -> Command {
    Command::cargo_bin("coursepay").unwrap()
}

#[test]
fn test_replays_operations_and_prints_balances() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         init,alice,student,,\n\
         credit,alice,student,100,topup-1\n\
         debit,alice,,40,order-1\n\
         credit,platform,admin,40,order-1-sale\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("owner,kind,balance"))
        .stdout(predicate::str::contains("alice,student,60"))
        .stdout(predicate::str::contains("platform,admin,40"));
}

#[test]
fn test_duplicate_ref_applies_once() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         credit,alice,student,100,topup-1\n\
         credit,alice,student,100,topup-1\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("alice,student,100"));
}

#[test]
fn test_insufficient_debit_is_reported_and_skipped() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         credit,alice,student,50,topup-1\n\
         debit,alice,,60,order-1\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error applying operation"))
        .stdout(predicate::str::contains("alice,student,50"));
}

#[test]
fn test_debit_before_any_credit_is_reported() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         debit,alice,,10,order-1\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error applying operation"));
}

#[test]
fn test_malformed_row_is_reported_and_skipped() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         refund,alice,,10,r-1\n\
         credit,bob,student,30,topup-1\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading operation"))
        .stdout(predicate::str::contains("bob,student,30"));
}

#[test]
fn test_credit_without_kind_is_rejected() {
    let input = fixture(
        "op,owner,kind,amount,ref\n\
         credit,alice,,100,topup-1\n",
    );

    coursepay()
        .arg(input.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error applying operation"));
}

#[test]
fn test_missing_input_file_fails() {
    coursepay()
        .arg("/no/such/ledger.csv")
        .assert()
        .failure();
}
