pub mod bookingmodel;
pub mod bookmarkmodel;
pub mod chatmodels;
pub mod companymodel;
pub mod complaintmodel;
pub mod servicemodel;
pub mod usermodel;
pub mod verificationmodels;
