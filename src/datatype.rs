pub type CsMat = sprs::CsMat<f64>;
pub type CsVec = sprs::CsVec<f64>;
