use std::fmt;

/// One reported domain: the stable per-domain output schema of the
/// pipeline (conceptually one tab-separated line).
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub name        : String,
    pub model       : String,
    pub d           : usize,
    pub sqfrom      : usize,
    pub sqto        : usize,
    pub hmmfrom     : usize,
    pub hmmto       : usize,
    pub iae         : usize,
    pub ibe         : usize,
    pub kae         : usize,
    pub kbe         : usize,
    pub ndom_exp    : f32,
    pub bprob       : f32,
    pub eprob       : f32,
    pub envsc_approx: f32,
    pub envsc_exact : f32,
    pub delta       : f32,
}

impl fmt::Display for DomainRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.2}\t{:.2}\t{:.2}",
            self.name,
            self.model,
            self.d,
            self.sqfrom,
            self.sqto,
            self.hmmfrom,
            self.hmmto,
            self.iae,
            self.ibe,
            self.kae,
            self.kbe,
            self.ndom_exp,
            self.bprob,
            self.eprob,
            self.envsc_approx,
            self.envsc_exact,
            self.delta,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_tab_separated() {
        let rec = DomainRecord {
            name: "seq1".to_string(),
            model: "model-m10".to_string(),
            d: 1,
            sqfrom: 5,
            sqto: 40,
            hmmfrom: 1,
            hmmto: 10,
            iae: 3,
            ibe: 42,
            kae: 1,
            kbe: 10,
            ndom_exp: 1.02,
            bprob: 0.98,
            eprob: 0.97,
            envsc_approx: 12.34,
            envsc_exact: 12.30,
            delta: 0.04,
        };
        let line = rec.to_string();
        assert_eq!(line.split('\t').count(), 17);
        assert!(line.starts_with("seq1\tmodel-m10\t1\t5\t40\t"));
    }
}
